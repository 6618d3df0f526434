// SPDX-License-Identifier: MIT OR Apache-2.0
//! Vertex ports.

use crate::element::ElementId;
use crate::schema::{MVertexPort, PortPosition};
use crate::vertex::VertexTag;
use serde::{Deserialize, Serialize};

/// Port direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortTnodeIo {
    /// Accepts incoming links only
    In,
    /// Starts outgoing links only
    Out,
    /// Either direction
    #[default]
    Normal,
}

impl PortTnodeIo {
    /// Can start a link
    pub fn can_source(self) -> bool {
        matches!(self, Self::Out | Self::Normal)
    }

    /// Can end a link
    pub fn can_target(self) -> bool {
        matches!(self, Self::In | Self::Normal)
    }
}

/// Energy domain; only ports of the same domain connect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortEnergyType {
    /// Electric power
    #[default]
    Electricity,
    /// Chilled water
    Cold,
    /// Heating water
    Hot,
    /// Water
    Water,
    /// Gas
    Gas,
    /// Electric bus
    EB,
    /// FB bus
    FB,
    /// PB bus
    PB,
    /// TB bus
    TB,
    /// CB bus
    CB,
}

impl PortEnergyType {
    /// Fill and stroke color used for the port marker
    pub fn color(self) -> &'static str {
        match self {
            Self::Electricity => "#0000FF",
            Self::Cold => "#00BFFF",
            Self::Hot => "#FF4500",
            Self::Water => "#1E90FF",
            Self::Gas | Self::EB | Self::FB | Self::PB | Self::TB | Self::CB => "#fff",
        }
    }
}

/// A connection point carrying at most one link
#[derive(Debug, Clone, PartialEq)]
pub struct VertexPort {
    /// Port id, unique within the vertex
    pub id: String,
    /// Topology node name
    pub tnode_name: String,
    /// Topology node code
    pub tnode_code: String,
    /// Virtual flag as loaded
    pub is_virtual: Option<u8>,
    /// 1 when the port must be connected
    pub need_con: u8,
    /// Display label
    pub label: Option<String>,
    /// Direction
    pub tnode_io: PortTnodeIo,
    /// Energy domain
    pub energy_type: PortEnergyType,
    /// Description
    pub descr: String,
    /// Relative position
    pub position: PortPosition,
    link: Option<ElementId>,
}

impl VertexPort {
    /// Build from a declaration, unlinked
    pub fn new(config: &MVertexPort) -> Self {
        Self {
            id: config.id.clone(),
            tnode_name: config.tnode_name.clone(),
            tnode_code: config.tnode_code.clone(),
            is_virtual: config.is_virtual,
            need_con: config.need_con,
            label: config.label.clone(),
            tnode_io: config.tnode_io,
            energy_type: config.energy_type,
            descr: config.descr.clone(),
            position: config.position,
            link: None,
        }
    }

    /// Link occupying the port
    pub fn link(&self) -> Option<&ElementId> {
        self.link.as_ref()
    }

    /// Whether a link occupies the port
    pub fn is_linked(&self) -> bool {
        self.link.is_some()
    }

    /// Attach a link. An occupied port is overwritten with a warning.
    pub fn set_link(&mut self, link: ElementId) {
        if let Some(current) = &self.link {
            if *current != link {
                tracing::warn!(port = %self.id, current = %current, new = %link, "Port already has a link, overwriting");
            }
        }
        self.link = Some(link);
    }

    /// Clear the occupancy
    pub fn remove_link(&mut self) -> Option<ElementId> {
        self.link.take()
    }

    /// Clear the occupancy only if `link` holds it
    pub fn release(&mut self, link: &ElementId) -> bool {
        if self.link.as_ref() == Some(link) {
            self.link = None;
            true
        } else {
            false
        }
    }

    /// Copy attributes from a declaration; the link is kept
    pub fn update(&mut self, config: &MVertexPort) {
        let link = self.link.take();
        *self = Self::new(config);
        self.link = link;
    }

    /// Declaration form; `virtual` follows the owning vertex's tag
    pub fn to_config(&self, tag: VertexTag) -> MVertexPort {
        MVertexPort {
            id: self.id.clone(),
            tnode_name: self.tnode_name.clone(),
            tnode_code: self.tnode_code.clone(),
            is_virtual: Some(u8::from(!matches!(tag, VertexTag::Pipe | VertexTag::Equipment))),
            need_con: self.need_con,
            label: self.label.clone(),
            tnode_io: self.tnode_io,
            energy_type: self.energy_type,
            descr: self.descr.clone(),
            position: self.position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(io: PortTnodeIo) -> VertexPort {
        VertexPort::new(&MVertexPort {
            id: "p1".into(),
            tnode_io: io,
            energy_type: PortEnergyType::Electricity,
            ..MVertexPort::default()
        })
    }

    #[test]
    fn test_set_link_overwrites() {
        let mut port = port(PortTnodeIo::Normal);
        port.set_link("l1".into());
        port.set_link("l2".into());
        assert_eq!(port.link().map(ElementId::as_str), Some("l2"));
        assert!(!port.release(&"l1".into()));
        assert!(port.release(&"l2".into()));
        assert!(!port.is_linked());
    }

    #[test]
    fn test_update_keeps_link() {
        let mut port = port(PortTnodeIo::In);
        port.set_link("l1".into());
        port.update(&MVertexPort {
            id: "p1".into(),
            label: Some("inlet".into()),
            tnode_io: PortTnodeIo::Out,
            energy_type: PortEnergyType::Water,
            ..MVertexPort::default()
        });
        assert_eq!(port.tnode_io, PortTnodeIo::Out);
        assert_eq!(port.link().map(ElementId::as_str), Some("l1"));
    }

    #[test]
    fn test_virtual_follows_tag() {
        let port = port(PortTnodeIo::Out);
        assert_eq!(port.to_config(VertexTag::Pipe).is_virtual, Some(0));
        assert_eq!(port.to_config(VertexTag::Station).is_virtual, Some(1));
    }

    #[test]
    fn test_direction_helpers() {
        assert!(PortTnodeIo::Normal.can_source() && PortTnodeIo::Normal.can_target());
        assert!(!PortTnodeIo::In.can_source());
        assert!(!PortTnodeIo::Out.can_target());
    }
}
