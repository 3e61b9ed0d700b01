//! End-to-end tests for value propagation through links.
//!
//! Covers kind conversion on push, element and channel addressing, chains,
//! diamonds, cycles under each policy and the step limit.

use pretty_assertions::assert_eq;
use propgraph::{
    CyclePolicy, Error, Graph, GraphConfig, GroupRole, LinkableId, ObjectRef, ObjectType,
    PropertyEventKind, PropertyHandle, Schema, Value,
};

// ============================================================================
// Helpers
// ============================================================================

fn owner(g: &mut Graph, name: &str) -> LinkableId {
    g.add_linkable(name, "Test").unwrap()
}

fn input(g: &mut Graph, owner: LinkableId, key: &str, schema: Schema) -> PropertyHandle {
    g.create_property(owner, GroupRole::Ins, key, schema).unwrap()
}

fn output(g: &mut Graph, owner: LinkableId, key: &str, schema: Schema) -> PropertyHandle {
    g.create_property(owner, GroupRole::Outs, key, schema).unwrap()
}

/// Three owners whose `x` inputs are chained a → b → c.
fn chain(config: GraphConfig) -> (Graph, [PropertyHandle; 3]) {
    let mut g = Graph::with_config(config);
    let mut handles = Vec::new();
    for name in ["a", "b", "c"] {
        let id = owner(&mut g, name);
        handles.push(input(&mut g, id, "x", Schema::number(0.0)));
    }
    g.link_from(handles[1], handles[0], None, None).unwrap();
    g.link_from(handles[2], handles[1], None, None).unwrap();
    (g, [handles[0], handles[1], handles[2]])
}

// ============================================================================
// 1. Conversion on push
// ============================================================================

#[test]
fn test_number_drives_boolean() {
    let mut g = Graph::new();
    let a = owner(&mut g, "a");
    let b = owner(&mut g, "b");
    let level = output(&mut g, a, "level", Schema::number(0.0));
    let visible = input(&mut g, b, "visible", Schema::boolean(true));

    // linking pushes the current source value immediately
    g.link_from(visible, level, None, None).unwrap();
    assert_eq!(g.value(visible).unwrap(), &Value::Boolean(false));

    g.set_value(level, 5.0).unwrap();
    assert_eq!(g.value(visible).unwrap(), &Value::Boolean(true));
    assert!(g.property(visible).unwrap().changed());
    assert!(g.linkable(b).unwrap().changed());
}

#[test]
fn test_string_number_enum_chain() {
    let mut g = Graph::new();
    let a = owner(&mut g, "a");
    let b = owner(&mut g, "b");
    let c = owner(&mut g, "c");
    let text = output(&mut g, a, "text", Schema::string("0"));
    let parsed = input(&mut g, b, "parsed", Schema::number(0.0));
    let mode = input(&mut g, c, "mode", Schema::option(["Off", "Low", "High"], 0));
    g.link_from(parsed, text, None, None).unwrap();
    g.link_from(mode, parsed, None, None).unwrap();

    g.set_value(text, "2.9").unwrap();
    assert_eq!(g.value(parsed).unwrap(), &Value::Number(2.9));
    assert_eq!(g.value(mode).unwrap(), &Value::Number(2.0));
    assert_eq!(g.property(mode).unwrap().option_text(), Some("High"));

    g.set_value(text, "40").unwrap();
    assert_eq!(g.validated_value(mode).unwrap(), Value::Number(2.0));

    g.set_value(text, "not a number").unwrap();
    assert_eq!(g.value(parsed).unwrap(), &Value::Number(0.0));
}

#[test]
fn test_pushes_fire_events() {
    let mut g = Graph::new();
    let a = owner(&mut g, "a");
    let b = owner(&mut g, "b");
    let click = output(&mut g, a, "click", Schema::boolean(false));
    let trigger = input(&mut g, b, "trigger", Schema::event());
    g.link_from(trigger, click, None, None).unwrap();
    g.set_value(click, true).unwrap();
    g.set_value(click, false).unwrap();
    // one fire for the link itself, one per write
    assert_eq!(g.value(trigger).unwrap(), &Value::Number(3.0));
}

#[test]
fn test_object_references() {
    let mut g = Graph::new();
    let a = owner(&mut g, "a");
    let b = owner(&mut g, "b");
    let camera = ObjectType::new("Node").derive("Camera");
    let src = output(&mut g, a, "camera", Schema::object(camera.clone()));
    let dst = input(&mut g, b, "target", Schema::any_object());
    g.link_from(dst, src, None, None).unwrap();

    let reference = ObjectRef::new("Camera", "main-camera");
    g.set_value(src, reference.clone()).unwrap();
    assert_eq!(g.value(dst).unwrap().as_object(), Some(&reference));
    assert!(g.set_value(src, 1.0).is_err());
}

// ============================================================================
// 2. Elements and channels
// ============================================================================

#[test]
fn test_element_addressing() {
    let mut g = Graph::new();
    let a = owner(&mut g, "a");
    let b = owner(&mut g, "b");
    let position = output(&mut g, a, "position", Schema::vector3([0.0; 3]));
    let height = input(&mut g, b, "height", Schema::number(0.0));
    let scale = input(&mut g, b, "scale", Schema::vector3([1.0; 3]));
    g.link_from(height, position, Some(1), None).unwrap();
    g.link_from(scale, height, None, Some(2)).unwrap();

    g.set_value(position, [1.0, 2.0, 3.0]).unwrap();
    assert_eq!(g.value(height).unwrap(), &Value::Number(2.0));
    assert_eq!(g.value(scale).unwrap(), &Value::from([1.0, 1.0, 2.0]));
}

#[test]
fn test_whole_array_copy() {
    let mut g = Graph::new();
    let a = owner(&mut g, "a");
    let b = owner(&mut g, "b");
    let src = output(&mut g, a, "color", Schema::color_rgb([0.0; 3]));
    let dst = input(&mut g, b, "color", Schema::color_rgb([1.0; 3]));
    g.link_from(dst, src, None, None).unwrap();
    g.set_value(src, [0.2, 0.4, 0.6]).unwrap();
    assert_eq!(g.value(dst).unwrap(), &Value::from([0.2, 0.4, 0.6]));
    assert!(g.set_value(src, [0.2, 0.4]).is_err());
}

#[test]
fn test_multi_channels() {
    let mut g = Graph::new();
    let a = owner(&mut g, "a");
    let b = owner(&mut g, "b");
    let c = owner(&mut g, "c");
    let single = output(&mut g, a, "single", Schema::number(0.0));
    let lanes = input(&mut g, b, "lanes", Schema::number(0.0).multi());
    let mirror = input(&mut g, c, "mirror", Schema::number(-1.0).multi());
    let first = input(&mut g, c, "first", Schema::number(0.0));

    g.set_channel_count(lanes, 3).unwrap();
    g.link_from(lanes, single, None, None).unwrap();
    g.link_from(mirror, lanes, None, None).unwrap();
    g.link_from(first, lanes, None, None).unwrap();

    // broadcast into every channel, channel count follows on multi → multi
    g.set_value(single, 0.5).unwrap();
    assert_eq!(g.value(lanes).unwrap(), &Value::Multi(vec![Value::Number(0.5); 3]));
    assert_eq!(g.value(mirror).unwrap(), &Value::Multi(vec![Value::Number(0.5); 3]));
    assert_eq!(g.value(first).unwrap(), &Value::Number(0.5));

    // growing the source grows the destination, seeded with the preset
    g.set_channel_count(lanes, 4).unwrap();
    assert_eq!(g.property(mirror).unwrap().channel_count(), 4);
    assert_eq!(g.value(mirror).unwrap().items().unwrap()[3], Value::Number(0.0));

    g.reset(mirror).unwrap();
    assert_eq!(g.value(mirror).unwrap(), &Value::Multi(vec![Value::Number(-1.0)]));
}

#[test]
fn test_default_detection_through_reset() {
    let mut g = Graph::new();
    let a = owner(&mut g, "a");
    let position = input(&mut g, a, "position", Schema::vector3([0.0; 3]));
    assert!(g.property(position).unwrap().is_default());

    g.set_value(position, [0.0, 0.0, 1.0]).unwrap();
    assert!(!g.property(position).unwrap().is_default());

    g.reset(position).unwrap();
    assert!(g.property(position).unwrap().is_default());
    assert_eq!(g.value(position).unwrap(), &Value::from([0.0, 0.0, 0.0]));
}

// ============================================================================
// 3. Topologies
// ============================================================================

#[test]
fn test_chain() {
    let (mut g, [a, b, c]) = chain(GraphConfig::default());
    let stats = g.set_value(a, 7.0).unwrap();
    assert_eq!(stats.links_pushed, 2);
    assert!(stats.cycles.is_empty());
    assert_eq!(g.value(b).unwrap(), &Value::Number(7.0));
    assert_eq!(g.value(c).unwrap(), &Value::Number(7.0));
}

#[test]
fn test_diamond_is_not_a_cycle() {
    let mut g = Graph::new();
    let a = owner(&mut g, "a");
    let b = owner(&mut g, "b");
    let c = owner(&mut g, "c");
    let d = owner(&mut g, "d");
    let top = output(&mut g, a, "out", Schema::number(0.0));
    let left = input(&mut g, b, "in", Schema::number(0.0));
    let right = input(&mut g, c, "in", Schema::number(0.0));
    let bottom = input(&mut g, d, "in", Schema::number(0.0));
    g.link_from(left, top, None, None).unwrap();
    g.link_from(right, top, None, None).unwrap();
    g.link_from(bottom, left, None, None).unwrap();
    g.link_from(bottom, right, None, None).unwrap();

    let stats = g.set_value(top, 1.0).unwrap();
    assert_eq!(stats.links_pushed, 4);
    assert!(stats.cycles.is_empty());
    assert_eq!(g.value(bottom).unwrap(), &Value::Number(1.0));
}

#[test]
fn test_cycle_policies() {
    for policy in [CyclePolicy::Ignore, CyclePolicy::Warn] {
        let (mut g, [a, _, c]) = chain(GraphConfig { cycle_policy: policy, ..GraphConfig::default() });
        let back = g.link_from(a, c, None, None).unwrap();
        let stats = g.set_value(a, 3.0).unwrap();
        assert_eq!(stats.links_pushed, 3);
        assert_eq!(stats.cycles.len(), 1);
        assert_eq!(g.value(c).unwrap(), &Value::Number(3.0));
        assert!(g.link(back).is_some());
    }

    let (mut g, [a, _, c]) = chain(GraphConfig { cycle_policy: CyclePolicy::Error, ..GraphConfig::default() });
    assert!(matches!(g.link_from(a, c, None, None), Err(Error::CycleDetected { .. })));
    assert!(matches!(g.set_value(a, 1.0), Err(Error::CycleDetected { .. })));
}

#[test]
fn test_step_limit() {
    let config = GraphConfig { max_propagation_steps: 1, ..GraphConfig::default() };
    let mut g = Graph::with_config(config);
    let a = owner(&mut g, "a");
    let b = owner(&mut g, "b");
    let c = owner(&mut g, "c");
    let pa = input(&mut g, a, "x", Schema::number(0.0));
    let pb = input(&mut g, b, "x", Schema::number(0.0));
    let pc = input(&mut g, c, "x", Schema::number(0.0));
    g.link_from(pb, pa, None, None).unwrap();
    g.link_from(pc, pb, None, None).unwrap();

    assert!(matches!(g.set_value(pa, 1.0), Err(Error::PropagationLimit(1))));
}

// ============================================================================
// 4. Events
// ============================================================================

#[test]
fn test_events_follow_the_push_order() {
    let (mut g, [a, b, c]) = chain(GraphConfig::default());
    g.drain_events();
    g.set_value(a, 1.0).unwrap();
    let events: Vec<_> = g.drain_events().into_iter().map(|e| (e.property, e.kind)).collect();
    assert_eq!(
        events,
        vec![
            (a, PropertyEventKind::Value),
            (b, PropertyEventKind::Value),
            (c, PropertyEventKind::Value),
        ]
    );
}
