// SPDX-License-Identifier: MIT OR Apache-2.0
//! Link validity rules.
//!
//! The checks are pure: they read the two vertices and ask the caller for
//! the reconnection status of any link already occupying a port. Renderers
//! use them as a gate while a connection is being dragged.

use crate::element::ElementId;
use crate::link::LinkEnd;
use crate::vertex::Vertex;
use std::fmt;

/// Why two ports cannot be linked, in rule order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRejection {
    /// A port does not exist on its vertex
    MissingPort,
    /// The source port is free but the target port is taken
    TargetOccupied,
    /// An occupying link is being reconnected towards a taken port
    Reconnecting,
    /// Energy domains differ
    EnergyMismatch,
    /// The source port only accepts incoming links
    SourceNotOutput,
    /// The target port only starts outgoing links
    TargetNotInput,
    /// A port already carries a link that is not being reconnected
    PortOccupied,
}

impl fmt::Display for LinkRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MissingPort => "port does not exist",
            Self::TargetOccupied => "target port is already linked",
            Self::Reconnecting => "link is being reconnected onto a linked port",
            Self::EnergyMismatch => "energy types differ",
            Self::SourceNotOutput => "source port is input only",
            Self::TargetNotInput => "target port is output only",
            Self::PortOccupied => "port already carries a link",
        };
        f.write_str(text)
    }
}

/// Check every rule, reporting the first that fails.
///
/// `reconnecting` reports whether an occupying link is currently having its
/// source or target moved.
pub fn check_link(
    source: &Vertex,
    source_port: &str,
    target: &Vertex,
    target_port: &str,
    reconnecting: impl Fn(&ElementId) -> Option<LinkEnd>,
) -> Result<(), LinkRejection> {
    let (Some(sport), Some(tport)) = (source.port(source_port), target.port(target_port)) else {
        return Err(LinkRejection::MissingPort);
    };

    if !sport.is_linked() && tport.is_linked() {
        return Err(LinkRejection::TargetOccupied);
    }

    let moving = |link: Option<&ElementId>, end: LinkEnd| {
        link.and_then(|id| reconnecting(id)) == Some(end)
    };
    if moving(sport.link(), LinkEnd::Target) && tport.is_linked() {
        return Err(LinkRejection::Reconnecting);
    }
    if moving(tport.link(), LinkEnd::Source) && sport.is_linked() {
        return Err(LinkRejection::Reconnecting);
    }

    if sport.energy_type != tport.energy_type {
        return Err(LinkRejection::EnergyMismatch);
    }
    if !sport.tnode_io.can_source() {
        return Err(LinkRejection::SourceNotOutput);
    }
    if !tport.tnode_io.can_target() {
        return Err(LinkRejection::TargetNotInput);
    }
    Ok(())
}

/// Whether `source_port` on `source` may link to `target_port` on `target`
pub fn validate_link(
    source: &Vertex,
    source_port: &str,
    target: &Vertex,
    target_port: &str,
    reconnecting: impl Fn(&ElementId) -> Option<LinkEnd>,
) -> bool {
    check_link(source, source_port, target, target_port, reconnecting).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{PortEnergyType, PortTnodeIo};
    use crate::schema::{MVertex, MVertexPort};
    use crate::vertex::VertexTag;

    fn vertex(id: &str, port: &str, io: PortTnodeIo, energy: PortEnergyType) -> Vertex {
        let mut config = MVertex::new(id, "node", VertexTag::Equipment);
        config.ports.push(MVertexPort {
            id: port.into(),
            tnode_io: io,
            energy_type: energy,
            ..MVertexPort::default()
        });
        Vertex::new(&config, None).unwrap()
    }

    fn idle(_: &ElementId) -> Option<LinkEnd> {
        None
    }

    #[test]
    fn test_valid_out_to_in() {
        let a = vertex("a", "p1", PortTnodeIo::Out, PortEnergyType::Electricity);
        let b = vertex("b", "p2", PortTnodeIo::In, PortEnergyType::Electricity);
        assert!(validate_link(&a, "p1", &b, "p2", idle));
        assert_eq!(check_link(&a, "missing", &b, "p2", idle), Err(LinkRejection::MissingPort));
    }

    #[test]
    fn test_direction_and_energy_rules() {
        for source_io in [PortTnodeIo::In, PortTnodeIo::Out, PortTnodeIo::Normal] {
            for target_io in [PortTnodeIo::In, PortTnodeIo::Out, PortTnodeIo::Normal] {
                let a = vertex("a", "p", source_io, PortEnergyType::Water);
                let b = vertex("b", "p", target_io, PortEnergyType::Water);
                let expected = source_io != PortTnodeIo::In && target_io != PortTnodeIo::Out;
                assert_eq!(validate_link(&a, "p", &b, "p", idle), expected, "{source_io:?} -> {target_io:?}");

                let c = vertex("c", "p", target_io, PortEnergyType::Gas);
                assert!(!validate_link(&a, "p", &c, "p", idle));
            }
        }
    }

    #[test]
    fn test_occupancy_rules() {
        let mut a = vertex("a", "p", PortTnodeIo::Normal, PortEnergyType::Hot);
        let mut b = vertex("b", "p", PortTnodeIo::Normal, PortEnergyType::Hot);

        b.port_mut("p").unwrap().set_link("l1".into());
        assert_eq!(check_link(&a, "p", &b, "p", idle), Err(LinkRejection::TargetOccupied));

        a.port_mut("p").unwrap().set_link("l0".into());
        assert!(validate_link(&a, "p", &b, "p", idle));

        let moving_target = |id: &ElementId| (id.as_str() == "l0").then_some(LinkEnd::Target);
        assert_eq!(check_link(&a, "p", &b, "p", moving_target), Err(LinkRejection::Reconnecting));

        let moving_source = |id: &ElementId| (id.as_str() == "l1").then_some(LinkEnd::Source);
        assert_eq!(check_link(&a, "p", &b, "p", moving_source), Err(LinkRejection::Reconnecting));
    }
}
