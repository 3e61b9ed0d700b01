//! End-to-end tests for link compatibility and link bookkeeping.
//!
//! Every link must be listed exactly once on each endpoint, whatever the
//! sequence of link and unlink calls that produced it.

use proptest::prelude::*;
use propgraph::{Error, Graph, GroupRole, LinkableId, ObjectType, PropertyHandle, Schema};

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

/// Both directions of every link agree.
fn assert_symmetric(g: &Graph) {
    for link in g.links() {
        let src = g.property(link.source()).unwrap();
        let dst = g.property(link.destination()).unwrap();
        assert_eq!(src.out_links().iter().filter(|l| **l == link.id()).count(), 1);
        assert_eq!(dst.in_links().iter().filter(|l| **l == link.id()).count(), 1);
    }

    let mut listed = 0;
    for linkable in g.linkables() {
        for p in linkable.ins().iter().chain(linkable.outs().iter()) {
            for id in p.in_links() {
                assert_eq!(g.link(*id).unwrap().destination(), p.handle());
            }
            for id in p.out_links() {
                assert_eq!(g.link(*id).unwrap().source(), p.handle());
                listed += 1;
            }
        }
    }
    assert_eq!(listed, g.link_count());
}

// ============================================================================
// 1. Compatibility rules
// ============================================================================

#[test]
fn test_destination_must_be_input() {
    let mut g = Graph::new();
    let a = owner(&mut g, "a");
    let b = owner(&mut g, "b");
    let src = output(&mut g, a, "out", Schema::number(0.0));
    let dst = output(&mut g, b, "out", Schema::number(0.0));

    assert!(!g.can_link_from(dst, src, None, None));
    assert!(matches!(g.link_from(dst, src, None, None), Err(Error::LinkError(_))));
}

#[test]
fn test_inputs_may_forward_to_inputs() {
    let mut g = Graph::new();
    let a = owner(&mut g, "a");
    let b = owner(&mut g, "b");
    let src = input(&mut g, a, "in", Schema::number(0.0));
    let dst = input(&mut g, b, "in", Schema::number(0.0));
    assert!(g.can_link_from(dst, src, None, None));
}

#[test]
fn test_kind_conversions() {
    let mut g = Graph::new();
    let a = owner(&mut g, "a");
    let b = owner(&mut g, "b");
    let number = output(&mut g, a, "number", Schema::number(0.0));
    let object = output(&mut g, a, "object", Schema::any_object());
    let event = output(&mut g, a, "event", Schema::event());
    let boolean = input(&mut g, b, "boolean", Schema::boolean(false));
    let string = input(&mut g, b, "string", Schema::string(""));
    let mode = input(&mut g, b, "mode", Schema::option(["A", "B"], 0));
    let target = input(&mut g, b, "target", Schema::any_object());

    assert!(g.can_link_from(boolean, number, None, None));
    assert!(g.can_link_from(string, number, None, None));
    assert!(g.can_link_from(mode, number, None, None));
    assert!(!g.can_link_from(mode, event, None, None));
    assert!(!g.can_link_from(target, number, None, None));
    assert!(!g.can_link_from(boolean, object, None, None));
    assert!(g.can_link_from(target, object, None, None));
}

#[test]
fn test_object_subtypes() {
    let mut g = Graph::new();
    let a = owner(&mut g, "a");
    let b = owner(&mut g, "b");
    let node = ObjectType::new("Node");
    let camera = node.derive("Camera");

    let camera_out = output(&mut g, a, "camera", Schema::object(camera.clone()));
    let node_out = output(&mut g, a, "node", Schema::object(node.clone()));
    let untyped_out = output(&mut g, a, "any", Schema::any_object());
    let node_in = input(&mut g, b, "node", Schema::object(node));
    let camera_in = input(&mut g, b, "camera", Schema::object(camera));
    let any_in = input(&mut g, b, "any", Schema::any_object());

    assert!(g.can_link_from(node_in, camera_out, None, None));
    assert!(!g.can_link_from(camera_in, node_out, None, None));
    assert!(g.can_link_from(any_in, camera_out, None, None));
    assert!(!g.can_link_from(camera_in, untyped_out, None, None));
}

#[test]
fn test_array_rules() {
    let mut g = Graph::new();
    let a = owner(&mut g, "a");
    let b = owner(&mut g, "b");
    let v3_out = output(&mut g, a, "v3", Schema::vector3([0.0; 3]));
    let v4_out = output(&mut g, a, "v4", Schema::vector4([0.0; 4]));
    let n_out = output(&mut g, a, "n", Schema::number(0.0));
    let v3_in = input(&mut g, b, "v3", Schema::vector3([0.0; 3]));
    let n_in = input(&mut g, b, "n", Schema::number(0.0));

    // whole arrays only to whole arrays of the same size
    assert!(g.can_link_from(v3_in, v3_out, None, None));
    assert!(!g.can_link_from(v3_in, v4_out, None, None));
    assert!(!g.can_link_from(n_in, v3_out, None, None));
    assert!(!g.can_link_from(v3_in, n_out, None, None));

    // element addressing
    assert!(g.can_link_from(n_in, v3_out, Some(2), None));
    assert!(g.can_link_from(v3_in, n_out, None, Some(0)));
    assert!(g.can_link_from(v3_in, v4_out, Some(3), Some(1)));

    // indices on scalars or out of range
    assert!(!g.can_link_from(n_in, n_out, Some(0), None));
    assert!(!g.can_link_from(v3_in, n_out, None, Some(3)));
    assert!(matches!(g.link_from(n_in, v3_out, Some(5), None), Err(Error::LinkError(_))));
}

#[test]
fn test_static_properties_never_link() {
    let mut g = Graph::new();
    let a = owner(&mut g, "a");
    let b = owner(&mut g, "b");
    let src = output(&mut g, a, "out", Schema::number(0.0));
    let fixed = input(&mut g, b, "fixed", Schema::number(0.0).non_linkable());
    let fixed_out = output(&mut g, a, "fixed", Schema::number(0.0).non_linkable());
    let plain = input(&mut g, b, "plain", Schema::number(0.0));

    assert!(!g.can_link_from(fixed, src, None, None));
    assert!(!g.can_link_to(fixed_out, plain, None, None));
}

#[test]
fn test_link_to_mirrors_link_from() {
    let mut g = Graph::new();
    let a = owner(&mut g, "a");
    let b = owner(&mut g, "b");
    let src = output(&mut g, a, "out", Schema::vector3([1.0, 2.0, 3.0]));
    let dst = input(&mut g, b, "in", Schema::number(0.0));

    let id = g.link_to(src, dst, Some(1), None).unwrap();
    let link = g.link(id).unwrap();
    assert_eq!(link.source(), src);
    assert_eq!(link.destination(), dst);
    assert_eq!(link.source_index(), Some(1));
    assert!(g.has_out_links(src, Some(1)));
    assert!(!g.has_out_links(src, Some(0)));
    assert!(g.has_main_in_link(dst));

    // unlink needs the same indices
    assert!(g.unlink_to(src, dst, None, None).is_err());
    g.unlink_to(src, dst, Some(1), None).unwrap();
    assert_eq!(g.link_count(), 0);
}

#[test]
fn test_indexed_in_link_is_not_main() {
    let mut g = Graph::new();
    let a = owner(&mut g, "a");
    let b = owner(&mut g, "b");
    let src = output(&mut g, a, "out", Schema::number(0.0));
    let dst = input(&mut g, b, "in", Schema::vector3([0.0; 3]));
    g.link_from(dst, src, None, Some(2)).unwrap();

    assert!(g.has_in_links(dst, None));
    assert!(g.has_in_links(dst, Some(2)));
    assert!(!g.has_in_links(dst, Some(0)));
    assert!(!g.has_main_in_link(dst));
}

#[test]
fn test_link_direction_is_symmetric() {
    let mut g = Graph::new();
    let a = owner(&mut g, "a");
    let b = owner(&mut g, "b");
    let handles = [
        output(&mut g, a, "n", Schema::number(0.0)),
        output(&mut g, a, "v3", Schema::vector3([0.0; 3])),
        output(&mut g, a, "text", Schema::string("")),
        input(&mut g, b, "flag", Schema::boolean(false)),
        input(&mut g, b, "v3", Schema::vector3([0.0; 3])),
        input(&mut g, b, "mode", Schema::option(["A", "B"], 0)),
    ];
    let indices = [None, Some(0), Some(2), Some(3)];

    for &src in &handles {
        for &dst in &handles {
            for si in indices {
                for di in indices {
                    let forward = g.can_link_to(src, dst, si, di);
                    assert_eq!(forward, g.can_link_from(dst, src, si, di));
                    if forward {
                        assert!(g.link_to(src, dst, si, di).is_ok());
                        g.unlink_from(dst, src, si, di).unwrap();
                    } else {
                        assert!(g.link_from(dst, src, si, di).is_err());
                    }
                }
            }
        }
    }
    assert_eq!(g.link_count(), 0);
}

// ============================================================================
// 2. Symmetry under arbitrary edit sequences
// ============================================================================

const POOL: usize = 4;

fn pool() -> (Graph, Vec<PropertyHandle>, Vec<PropertyHandle>) {
    let mut g = Graph::new();
    let mut sources = Vec::new();
    let mut inputs = Vec::new();
    for i in 0..POOL {
        let id = owner(&mut g, &format!("n{i}"));
        inputs.push(input(&mut g, id, "in", Schema::number(0.0)));
        sources.push(output(&mut g, id, "out", Schema::number(0.0)));
    }
    // inputs can be sources too
    sources.extend(inputs.iter().copied());
    (g, sources, inputs)
}

proptest! {
    #[test]
    fn prop_links_listed_on_both_endpoints(
        ops in proptest::collection::vec((0..2 * POOL, 0..POOL, any::<bool>()), 1..48)
    ) {
        let (mut g, sources, inputs) = pool();
        for (s, d, add) in ops {
            let (src, dst) = (sources[s], inputs[d]);
            if add {
                let allowed = g.can_link_from(dst, src, None, None);
                prop_assert_eq!(g.link_from(dst, src, None, None).is_ok(), allowed);
            } else {
                let _ = g.unlink_from(dst, src, None, None);
            }
            assert_symmetric(&g);
        }

        // disposing every owner leaves nothing behind
        let ids: Vec<_> = g.linkable_ids().to_vec();
        for id in ids {
            g.remove_linkable(id).unwrap();
            assert_symmetric(&g);
        }
        prop_assert_eq!(g.link_count(), 0);
    }
}
