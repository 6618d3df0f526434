// SPDX-License-Identifier: MIT OR Apache-2.0
//! Project graph properties: round-trip, cascade delete, port occupancy and
//! link validity.

use pretty_assertions::assert_eq;
use serde_json::json;
use topo_editor_engine::{
    GraphError, LinkRejection, MLink, MLinkPoint, MProject, MVertex, MVertexPort, PortEnergyType,
    PortTnodeIo, Project, VertexTag,
};

fn port(id: &str, io: PortTnodeIo, energy: PortEnergyType) -> MVertexPort {
    MVertexPort {
        id: id.to_string(),
        tnode_io: io,
        energy_type: energy,
        ..MVertexPort::default()
    }
}

fn vertex(id: &str, ports: Vec<MVertexPort>) -> MVertex {
    let mut config = MVertex::new(id, "switch", VertexTag::Equipment);
    config.x = 10.0;
    config.y = 20.0;
    config.width = 60.0;
    config.height = 40.0;
    config.ports = ports;
    config
}

fn link(id: &str, source: (&str, &str), target: (&str, &str)) -> MLink {
    MLink::new(
        id,
        MLinkPoint::new(source.0, source.1),
        MLinkPoint::new(target.0, target.1),
    )
}

fn substation() -> MProject {
    let electricity = PortEnergyType::Electricity;
    let mut bay = MVertex::new("bay", "bay", VertexTag::Unit);
    bay.children = vec![
        vertex("breaker", vec![
            port("in", PortTnodeIo::In, electricity),
            port("out", PortTnodeIo::Out, electricity),
        ]),
        vertex("meter", vec![port("in", PortTnodeIo::In, electricity)]),
    ];
    MProject {
        id: "p1".to_string(),
        name: "Substation".to_string(),
        vertexes: vec![
            vertex("feeder", vec![port("out", PortTnodeIo::Out, electricity)]),
            bay,
        ],
        links: vec![
            link("l1", ("feeder", "out"), ("breaker", "in")),
            link("l2", ("breaker", "out"), ("meter", "in")),
        ],
        store: json!({ "P1": 3 }).as_object().cloned().unwrap_or_default(),
        ..MProject::default()
    }
}

#[test]
fn test_round_trip_preserves_order() {
    let first = Project::from_config(&substation()).unwrap();
    let json = first.to_json();

    let mut second = Project::new();
    second.init(&json).unwrap();
    assert_eq!(second.to_json(), json);

    // Through the wire format too
    let text = serde_json::to_string(&json).unwrap();
    let parsed: MProject = serde_json::from_str(&text).unwrap();
    assert_eq!(Project::from_config(&parsed).unwrap().to_json(), json);
}

#[test]
fn test_cascade_delete_for_every_linked_vertex() {
    let ids = ["feeder", "breaker", "meter"];
    for id in ids {
        let mut project = Project::from_config(&substation()).unwrap();
        let attached = project.get_vertex_relations(&id.into());
        assert!(!attached.is_empty());

        project.remove_vertex(&id.into()).unwrap();
        for link in &attached {
            assert!(!project.has_link(link), "{link} survived removal of {id}");
            assert!(project.get_element(link).is_none());
        }
    }
}

#[test]
fn test_removing_group_takes_children_and_links() {
    let mut project = Project::from_config(&substation()).unwrap();
    project.remove_vertex(&"bay".into()).unwrap();
    assert_eq!(project.element_count(), 1);
    assert!(project.links().is_empty());
    let feeder = project.get_vertex(&"feeder".into()).unwrap();
    assert!(!feeder.port("out").unwrap().is_linked());
}

fn assert_ports_consistent(project: &Project) {
    for vertex in project.all_vertexes() {
        for port in vertex.ports() {
            if let Some(link_id) = port.link() {
                let link = project.get_link(link_id).expect("occupying link exists");
                let here = (vertex.id(), port.id.as_str());
                let source = (&link.source.vertex, link.source.port.as_str());
                let target = (&link.target.vertex, link.target.port.as_str());
                assert!(here == source || here == target);
            }
        }
    }
    for link in project.all_links() {
        for point in [&link.source, &link.target] {
            let port = project
                .get_vertex(&point.vertex)
                .and_then(|vertex| vertex.port(&point.port))
                .expect("endpoint port exists");
            assert_eq!(port.link(), Some(link.id()));
        }
    }
}

#[test]
fn test_at_most_one_link_per_port() {
    let mut project = Project::new();
    let electricity = PortEnergyType::Electricity;
    project
        .add_vertex(&vertex("a", vec![port("o", PortTnodeIo::Out, electricity)]), None)
        .unwrap();
    project
        .add_vertex(&vertex("b", vec![port("i", PortTnodeIo::In, electricity)]), None)
        .unwrap();
    project
        .add_vertex(&vertex("c", vec![port("i", PortTnodeIo::In, electricity)]), None)
        .unwrap();

    project.add_link(&link("l1", ("a", "o"), ("b", "i"))).unwrap();
    assert_ports_consistent(&project);

    // a.o is taken
    let err = project.add_link(&link("l2", ("a", "o"), ("c", "i"))).unwrap_err();
    assert!(matches!(err, GraphError::IllegalLink { .. }));
    assert_ports_consistent(&project);

    project.remove_link(&"l1".into()).unwrap();
    project.add_link(&link("l2", ("a", "o"), ("c", "i"))).unwrap();
    assert_ports_consistent(&project);
    assert!(!project.get_vertex(&"b".into()).unwrap().port("i").unwrap().is_linked());
}

#[test]
fn test_validity_rejects_energy_and_direction() {
    let energies = [PortEnergyType::Electricity, PortEnergyType::Water];
    let ios = [PortTnodeIo::In, PortTnodeIo::Out, PortTnodeIo::Normal];

    for source_energy in energies {
        for target_energy in energies {
            for source_io in ios {
                for target_io in ios {
                    let mut project = Project::new();
                    project
                        .add_vertex(&vertex("a", vec![port("p", source_io, source_energy)]), None)
                        .unwrap();
                    project
                        .add_vertex(&vertex("b", vec![port("p", target_io, target_energy)]), None)
                        .unwrap();

                    let valid = project.validate_link(&"a".into(), "p", &"b".into(), "p");
                    let expected = source_energy == target_energy
                        && source_io != PortTnodeIo::In
                        && target_io != PortTnodeIo::Out;
                    assert_eq!(valid, expected, "{source_energy:?}/{source_io:?} -> {target_energy:?}/{target_io:?}");
                }
            }
        }
    }
}

#[test]
fn test_electricity_scenario() {
    let electricity = PortEnergyType::Electricity;
    let mut project = Project::new();
    project
        .add_vertex(&vertex("A", vec![port("p1", PortTnodeIo::Out, electricity)]), None)
        .unwrap();
    project
        .add_vertex(&vertex("B", vec![port("p2", PortTnodeIo::In, electricity)]), None)
        .unwrap();
    project.add_link(&link("AB", ("A", "p1"), ("B", "p2"))).unwrap();

    let mut other = Project::new();
    other
        .add_vertex(&vertex("A", vec![port("p1", PortTnodeIo::Out, electricity)]), None)
        .unwrap();
    other
        .add_vertex(&vertex("B", vec![port("p2", PortTnodeIo::Out, electricity)]), None)
        .unwrap();
    let err = other.add_link(&link("AB", ("A", "p1"), ("B", "p2"))).unwrap_err();
    assert_eq!(
        err,
        GraphError::IllegalLink {
            source_vertex: "A".into(),
            source_port: "p1".to_string(),
            target_vertex: "B".into(),
            target_port: "p2".to_string(),
            reason: LinkRejection::TargetNotInput,
        }
    );
}

#[test]
fn test_failed_init_leaves_project_intact() {
    let mut project = Project::from_config(&substation()).unwrap();
    let before = project.to_json();

    let mut next = substation();
    next.id = "p2".to_string();
    next.links.push(link("l3", ("meter", "in"), ("feeder", "out")));
    assert!(project.init(&next).is_err());

    assert_eq!(project.id, "p1");
    assert_eq!(project.to_json(), before);
}
