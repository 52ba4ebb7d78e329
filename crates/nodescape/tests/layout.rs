//! Integration tests for automatic child layout

use nodescape::layout::{LayoutMode, LayoutConfig};
use nodescape::prelude::*;
use proptest::prelude::*;

const FRAME: Rect = Rect::new(0.0, 0.0, 400.0, 300.0);

fn parent_with_children(count: usize, config: LayoutConfig) -> Model {
    let mut model = Model::with_layout_config(config);
    let stamp = model.begin_update();
    model.add_or_update_node(
        &NodeDescriptor::new("p", NodeType::Namespace).with_boundary(FRAME),
        stamp,
    );
    for i in 0..count {
        model.add_or_update_node(&NodeDescriptor::new(format!("p.c{:02}", i), NodeType::Type), stamp);
    }
    model
}

fn child_rects(model: &Model) -> Vec<Rect> {
    model
        .node_by_name("p")
        .unwrap()
        .children
        .iter()
        .map(|c| model.node_boundary(*c).unwrap())
        .collect()
}

proptest! {
    #[test]
    fn prop_children_fit_inside_parent(count in 1usize..40) {
        let mut model = parent_with_children(count, LayoutConfig::default());
        let p = Id::from_name("p");
        let outcome = model.ensure_layout(p).unwrap();
        prop_assert_eq!(outcome.placed, count);

        let frame = model.global_rect(p).unwrap();
        for child in model.node(p).unwrap().children.clone() {
            let rect = model.global_rect(child).unwrap();
            prop_assert!(rect.x0 >= frame.x0 - 1e-6 && rect.x1 <= frame.x1 + 1e-6);
            prop_assert!(rect.y0 >= frame.y0 - 1e-6 && rect.y1 <= frame.y1 + 1e-6);
        }
    }

    #[test]
    fn prop_full_layout_never_overlaps(count in 2usize..30) {
        let mut model = parent_with_children(count, LayoutConfig::default());
        model.ensure_layout(Id::from_name("p"));
        let rects = child_rects(&model);
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                prop_assert!(a.intersect(*b).area() <= 0.0);
            }
        }
    }
}

#[test]
fn test_density_changes_spacing() {
    let distance = |density: Density| {
        let mut model = parent_with_children(2, LayoutConfig::default().with_density(density));
        model.ensure_layout(Id::from_name("p"));
        let rects = child_rects(&model);
        (rects[1].origin() - rects[0].origin()).hypot()
    };
    assert!(distance(Density::Spacious) > distance(Density::Balanced));
    assert!(distance(Density::Balanced) > distance(Density::Compact));
}

#[test]
fn test_zoom_is_clamped_to_band() {
    let config = LayoutConfig::default().with_zoom_band(0.5, 0.8);
    let mut model = parent_with_children(30, config);
    let outcome = model.ensure_layout(Id::from_name("p")).unwrap();
    assert_eq!(outcome.zoom, 0.5);

    let mut single = parent_with_children(1, LayoutConfig::default().with_zoom_band(0.001, 0.8));
    let outcome = single.ensure_layout(Id::from_name("p")).unwrap();
    assert_eq!(outcome.zoom, 0.8);
}

#[test]
fn test_linked_siblings_are_ordered_source_first() {
    let mut model = parent_with_children(0, LayoutConfig::default());
    let stamp = model.begin_update();
    for name in ["p.z", "p.y", "p.x"] {
        model.add_or_update_node(&NodeDescriptor::new(name, NodeType::Type), stamp);
    }
    model.add_or_update_link(&LinkDescriptor::new("p.x", "p.y"), stamp);
    model.add_or_update_link(&LinkDescriptor::new("p.y", "p.z"), stamp);
    model.ensure_layout(Id::from_name("p"));

    let origin = |name: &str| model.node_by_name(name).unwrap().boundary.origin();
    let key = |p: kurbo::Point| (p.y, p.x);
    assert!(key(origin("p.x")) < key(origin("p.y")));
    assert!(key(origin("p.y")) < key(origin("p.z")));
}

#[test]
fn test_new_child_of_customized_parent_is_placed_incrementally() {
    let mut model = parent_with_children(3, LayoutConfig::default());
    let p = Id::from_name("p");
    model.ensure_layout(p);
    let moved = Rect::new(500.0, 500.0, 660.0, 620.0);
    model.set_node_boundary(Id::from_name("p.c00"), moved);
    let before = child_rects(&model);

    let stamp = model.begin_update();
    model.add_or_update_node(&NodeDescriptor::new("p.new", NodeType::Type), stamp);
    let outcome = model.ensure_layout(p).unwrap();
    assert_eq!(outcome.mode, LayoutMode::Incremental);
    assert_eq!(outcome.placed, 1);

    let after = child_rects(&model);
    assert_eq!(&after[..3], &before[..]);
    let fresh = model.node_boundary(Id::from_name("p.new")).unwrap();
    assert!(after[..3].iter().all(|r| r.intersect(fresh).area() <= 0.0));
}

#[test]
fn test_relayout_discards_manual_arrangement() {
    let mut model = parent_with_children(2, LayoutConfig::default());
    let p = Id::from_name("p");
    model.ensure_layout(p);
    let original = child_rects(&model);
    model.set_node_boundary(Id::from_name("p.c00"), Rect::new(900.0, 900.0, 1060.0, 1020.0));

    let outcome = model.relayout(p).unwrap();
    assert_ne!(outcome.mode, LayoutMode::Incremental);
    assert_eq!(child_rects(&model), original);
}

#[test]
fn test_root_keeps_identity_container() {
    let mut model = Model::new();
    let stamp = model.begin_update();
    for i in 0..5 {
        model.add_or_update_node(&NodeDescriptor::new(format!("n{}", i), NodeType::Group), stamp);
    }
    model.layout_all();
    assert_eq!(model.node_container(Id::ROOT), Some((1.0, Vec2::ZERO)));
    assert!(model.nodes().all(|n| n.is_root() || !n.boundary.is_zero_area()));
}

#[test]
fn test_new_layout_config_rearranges_uncustomized_parents() {
    let mut model = parent_with_children(2, LayoutConfig::default().with_density(Density::Compact));
    let p = Id::from_name("p");
    model.ensure_layout(p);
    let compact = child_rects(&model);

    model.set_layout_config(LayoutConfig::default().with_density(Density::Spacious));
    assert!(model.node(p).unwrap().is_layout_required);
    model.ensure_layout(p);
    assert_ne!(child_rects(&model), compact);
}

#[test]
fn test_explicit_positions_survive_layout_of_new_siblings() {
    let pinned = Rect::new(500.0, 500.0, 600.0, 580.0);
    let mut model = nodescape::build(&[
        NodeDescriptor::new("a", NodeType::Group).with_boundary(pinned).into(),
        NodeDescriptor::new("b", NodeType::Group).into(),
    ]);
    model.layout_all();

    assert_eq!(model.node_boundary(Id::from_name("a")), Some(pinned));
    let b = model.node_boundary(Id::from_name("b")).unwrap();
    assert!(!b.is_zero_area());
    assert!(b.intersect(pinned).area() <= 0.0);

    // An explicit relayout discards supplied positions too
    let outcome = model.relayout(Id::ROOT).unwrap();
    assert_eq!(outcome.mode, LayoutMode::Grid);
    assert_ne!(model.node_boundary(Id::from_name("a")), Some(pinned));
}
