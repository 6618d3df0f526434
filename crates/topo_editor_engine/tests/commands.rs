// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command history through the editor app, renderer kept in sync.

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use topo_editor_engine::commands::{AddElementCmd, ClearGraphCmd, DelElementCmd};
use topo_editor_engine::{
    App, CommandError, ElementConfig, ElementId, EngineConfig, GridType, MLink, MLinkPoint, MProject, MVertex,
    MVertexPort, MemoryRenderer, PortTnodeIo, RenderLayer, SharedRenderer, VertexTag,
};

fn app() -> App {
    App::new(EngineConfig::default(), Box::new(MemoryRenderer::new()))
}

fn vertex(id: &str, io: PortTnodeIo) -> MVertex {
    let mut config = MVertex::new(id, "transformer", VertexTag::Equipment);
    config.width = 80.0;
    config.height = 80.0;
    config.ports = vec![MVertexPort {
        id: "p".to_string(),
        tnode_io: io,
        ..MVertexPort::default()
    }];
    config
}

fn link(id: &str) -> MLink {
    MLink::new(id, MLinkPoint::new("a", "p"), MLinkPoint::new("b", "p"))
}

fn with_two_vertices() -> App {
    let mut app = app();
    app.execute("AddElementCmd", json!({ "element": vertex("a", PortTnodeIo::Out) }))
        .unwrap();
    app.execute("AddElementCmd", json!({ "element": vertex("b", PortTnodeIo::In) }))
        .unwrap();
    app
}

#[test]
fn test_add_then_undo_removes_vertex() {
    let mut app = app();
    let config = vertex("v1", PortTnodeIo::Normal);
    app.execute("AddElementCmd", json!({ "element": config })).unwrap();
    assert!(app.project().contains(&"v1".into()));
    assert!(app.context().renderer().has_node(&"v1".into()));

    app.undo(1).unwrap();
    assert!(!app.project().contains(&"v1".into()));
    assert!(!app.context().renderer().has_node(&"v1".into()));
}

#[test]
fn test_add_generates_missing_id() {
    let mut app = app();
    let mut config = vertex("", PortTnodeIo::Normal);
    config.element.id = Default::default();
    app.execute_command(AddElementCmd::new(config)).unwrap();
    assert_eq!(app.project().vertexes().len(), 1);
    assert!(!app.project().vertexes()[0].is_empty());
}

#[test]
fn test_undo_redo_is_inverse() {
    let mut app = with_two_vertices();
    app.execute("AddElementCmd", json!({ "element": link("l1") })).unwrap();
    let mut moved = app.project().vertex_config(&"a".into()).unwrap();
    moved.x = 300.0;
    moved.element.name = "T1".to_string();
    app.execute("UpdateVertexCmd", json!({ "newVertex": moved })).unwrap();

    let before_undo = app.project().to_json();
    app.undo(1).unwrap();
    assert_eq!(app.project().get_vertex(&"a".into()).unwrap().x, 0.0);
    app.redo(1).unwrap();
    assert_eq!(app.project().to_json(), before_undo);

    // A new command drops the redo stack
    app.undo(1).unwrap();
    app.execute("UpdateCanvasCmd", json!({ "gridType": "mesh", "gridSize": 10.0 }))
        .unwrap();
    assert!(!app.commands().can_redo());
    assert_eq!(app.redo(1).unwrap(), None);
}

#[test]
fn test_delete_restores_cascaded_links() {
    let mut app = with_two_vertices();
    app.execute("AddElementCmd", json!({ "element": link("l1") })).unwrap();
    let snapshot = app.project().to_json();

    let target: ElementConfig = app.project().vertex_config(&"b".into()).unwrap().into();
    app.execute_command(DelElementCmd::new(vec![target])).unwrap();
    assert!(!app.project().has_link(&"l1".into()));
    assert!(!app.context().renderer().has_edge(&"l1".into()));

    let history = app.history().unwrap();
    let options = &history.undo_stack.last().unwrap().options;
    assert_eq!(options["links"][0]["id"], json!("l1"));

    app.undo(1).unwrap();
    assert_eq!(app.project().to_json(), snapshot);
    assert!(app.context().renderer().has_edge(&"l1".into()));
}

#[test]
fn test_bounded_history_loses_oldest() {
    let mut config = EngineConfig::default();
    config.command.max_stack_size = 2;
    let mut app = App::new(config, Box::new(MemoryRenderer::new()));
    for id in ["a", "b", "c", "d"] {
        app.execute("AddElementCmd", json!({ "element": vertex(id, PortTnodeIo::Normal) }))
            .unwrap();
        assert!(app.commands().undo_len() <= 2);
    }
    app.undo(10).unwrap();
    let remaining: Vec<String> = app.project().vertexes().iter().map(ToString::to_string).collect();
    assert_eq!(remaining, vec!["a", "b"]);
}

#[test]
fn test_illegal_link_command_is_not_recorded() {
    let mut app = app();
    app.execute("AddElementCmd", json!({ "element": vertex("a", PortTnodeIo::Out) }))
        .unwrap();
    app.execute("AddElementCmd", json!({ "element": vertex("b", PortTnodeIo::Out) }))
        .unwrap();
    let err = app
        .execute("AddElementCmd", json!({ "element": link("l1") }))
        .unwrap_err();
    assert!(matches!(err, CommandError::Graph(_)));
    assert_eq!(app.commands().undo_len(), 2);
}

#[test]
fn test_update_link_and_undo() {
    let mut app = with_two_vertices();
    app.execute("AddElementCmd", json!({ "element": link("l1") })).unwrap();
    let mut running = app.project().link_config(&"l1".into()).unwrap();
    running.is_running = Some(true);
    app.execute("UpdateLinkCmd", json!({ "newLink": running })).unwrap();
    assert!(app.project().get_link(&"l1".into()).unwrap().is_running);
    app.undo(1).unwrap();
    assert!(!app.project().get_link(&"l1".into()).unwrap().is_running);

    let missing = link("zz");
    assert!(app.execute("UpdateLinkCmd", json!({ "newLink": missing })).is_err());
}

#[test]
fn test_canvas_command_and_undo() {
    let mut app = app();
    app.execute(
        "UpdateCanvasCmd",
        json!({ "gridType": "dot", "gridColor": "#ff0000", "gridSize": 12.0 }),
    )
    .unwrap();
    assert_eq!(app.project().grid_type, Some(GridType::Dot));
    assert_eq!(app.project().grid_size, Some(12.0));
    app.undo(1).unwrap();
    assert_eq!(app.project().grid_type, None);
}

#[test]
fn test_clear_graph_command_undo_reloads() {
    let mut app = with_two_vertices();
    app.execute("AddElementCmd", json!({ "element": link("l1") })).unwrap();
    let snapshot = app.project().to_json();

    app.execute_command(ClearGraphCmd::new()).unwrap();
    assert_eq!(app.project().element_count(), 0);
    assert_eq!(app.commands().undo_len(), 4);

    app.undo(1).unwrap();
    assert_eq!(app.project().to_json(), snapshot);
    assert!(app.context().renderer().has_edge(&"l1".into()));

    app.clear_graph();
    assert!(!app.commands().can_undo());
}

#[test]
fn test_history_survives_reload() {
    let mut app = with_two_vertices();
    let history = app.history().unwrap();
    let text = serde_json::to_string(&history).unwrap();
    let project = app.project().to_json();

    let mut reloaded = self::app();
    reloaded.reset_project(&project).unwrap();
    reloaded.load_history(&serde_json::from_str(&text).unwrap()).unwrap();
    assert_eq!(reloaded.commands().undo_ids(), vec![1, 2]);

    reloaded.undo(1).unwrap();
    assert!(!reloaded.project().contains(&"b".into()));
    assert!(reloaded.project().contains(&"a".into()));
}

#[test]
fn test_renderer_changes_flow_back() {
    let renderer: SharedRenderer<MemoryRenderer> = Arc::new(Mutex::new(MemoryRenderer::new()));
    let mut app = App::new(EngineConfig::default(), Box::new(Arc::clone(&renderer)));
    let mut group = MVertex::new("g", "bay", VertexTag::Unit);
    group.width = 400.0;
    let project = MProject {
        id: "p".to_string(),
        vertexes: vec![group, vertex("a", PortTnodeIo::Out)],
        grid_type: Some(GridType::Mesh),
        ..MProject::default()
    };
    app.reset_project(&project).unwrap();
    assert_eq!(renderer.lock().node_count(), 2);
    assert!(renderer.lock().grid().visible);

    renderer.lock().drag(&"a".into(), 40.0, 50.0);
    renderer.lock().drop_into(&"a".into(), Some("g".into()));
    assert_eq!(app.sync_renderer(), 2);

    let a = app.project().get_vertex(&"a".into()).unwrap();
    assert_eq!((a.x, a.y), (40.0, 50.0));
    assert_eq!(a.parent, Some("g".into()));
    assert_eq!(app.project().vertexes(), &[ElementId::from("g")]);
}

#[test]
fn test_vertex_update_reaches_renderer() {
    let renderer: SharedRenderer<MemoryRenderer> = Arc::new(Mutex::new(MemoryRenderer::new()));
    let mut app = App::new(EngineConfig::default(), Box::new(Arc::clone(&renderer)));
    app.execute("AddElementCmd", json!({ "element": vertex("a", PortTnodeIo::Out) }))
        .unwrap();

    let mut config = app.project().vertex_config(&"a".into()).unwrap();
    config.x = 15.0;
    config.width = 120.0;
    config.angle = 90.0;
    config.element.style.fill = Some("#00ff00".to_string());
    app.execute("UpdateVertexCmd", json!({ "newVertex": config })).unwrap();

    let renderer = renderer.lock();
    let node = renderer.node(&"a".into()).unwrap();
    assert_eq!((node.spec.x, node.spec.width, node.spec.angle), (15.0, 120.0, 90.0));
    let style = renderer
        .get_attr_by_path(&"a".into(), "container/style")
        .unwrap();
    assert!(style.as_str().unwrap().contains("--fill: #00ff00"));
}

#[test]
fn test_delete_child_listed_before_group() {
    let mut app = app();
    let mut group = MVertex::new("g", "bay", VertexTag::Unit);
    group.width = 300.0;
    group.children = vec![vertex("c", PortTnodeIo::Normal)];
    app.execute("AddElementCmd", json!({ "element": group })).unwrap();
    let snapshot = app.project().to_json();

    let child: ElementConfig = app.project().vertex_config(&"c".into()).unwrap().into();
    let group: ElementConfig = app.project().vertex_config(&"g".into()).unwrap().into();
    app.execute_command(DelElementCmd::new(vec![child, group])).unwrap();
    assert!(!app.project().contains(&"g".into()));
    assert!(!app.project().contains(&"c".into()));

    app.undo(1).unwrap();
    assert_eq!(app.project().to_json(), snapshot);
    assert!(app.context().renderer().has_node(&"c".into()));
    assert_eq!(app.commands().undo_len(), 1);
}

#[test]
fn test_failed_delete_undo_restores_nothing() {
    let mut app = with_two_vertices();
    app.execute("AddElementCmd", json!({ "element": link("l1") })).unwrap();
    let a: ElementConfig = app.project().vertex_config(&"a".into()).unwrap().into();
    let b: ElementConfig = app.project().vertex_config(&"b".into()).unwrap().into();
    app.execute_command(DelElementCmd::new(vec![a, b])).unwrap();

    // Someone else takes the id of the second vertex
    app.context_mut().add_vertex(&vertex("b", PortTnodeIo::Normal)).unwrap();

    assert!(app.undo(1).is_err());
    assert!(!app.project().contains(&"a".into()));
    assert!(!app.context().renderer().has_node(&"a".into()));
    assert!(!app.project().has_link(&"l1".into()));
    assert_eq!(app.commands().undo_len(), 4);
}

#[test]
fn test_port_changes_reach_renderer() {
    let renderer: SharedRenderer<MemoryRenderer> = Arc::new(Mutex::new(MemoryRenderer::new()));
    let mut app = App::new(EngineConfig::default(), Box::new(Arc::clone(&renderer)));
    app.execute("AddElementCmd", json!({ "element": vertex("a", PortTnodeIo::Out) }))
        .unwrap();

    let mut config = app.project().vertex_config(&"a".into()).unwrap();
    config.ports[0].position.ref_x = 1.0;
    config.ports.push(MVertexPort {
        id: "q".to_string(),
        tnode_io: PortTnodeIo::In,
        ..MVertexPort::default()
    });
    app.execute("UpdateVertexCmd", json!({ "newVertex": config })).unwrap();
    let ports = |renderer: &SharedRenderer<MemoryRenderer>| -> Vec<(String, f64)> {
        renderer
            .lock()
            .node(&"a".into())
            .unwrap()
            .spec
            .ports
            .iter()
            .map(|(id, position)| (id.clone(), position.ref_x))
            .collect()
    };
    assert_eq!(ports(&renderer), vec![("p".to_string(), 1.0), ("q".to_string(), 0.0)]);

    let mut config = app.project().vertex_config(&"a".into()).unwrap();
    config.ports.remove(0);
    app.execute("UpdateVertexCmd", json!({ "newVertex": config })).unwrap();
    assert_eq!(ports(&renderer), vec![("q".to_string(), 0.0)]);

    app.undo(2).unwrap();
    assert_eq!(ports(&renderer), vec![("p".to_string(), 0.0)]);
}

#[test]
fn test_failed_reset_keeps_project_and_canvas() {
    let mut app = with_two_vertices();
    app.execute("AddElementCmd", json!({ "element": link("l1") })).unwrap();
    let before = app.project().to_json();

    let broken = MProject {
        id: "other".to_string(),
        vertexes: vec![vertex("x", PortTnodeIo::In), vertex("y", PortTnodeIo::In)],
        links: vec![MLink::new("bad", MLinkPoint::new("x", "p"), MLinkPoint::new("y", "p"))],
        ..MProject::default()
    };
    assert!(app.reset_project(&broken).is_err());

    assert_eq!(app.project().to_json(), before);
    assert!(app.context().renderer().has_node(&"a".into()));
    assert!(app.context().renderer().has_edge(&"l1".into()));
    assert_eq!(app.commands().undo_len(), 3);
}
