//! Integration tests for scene reconciliation

use mathboard_scene::{
    BackendOps, DrawingBackend, MemoryBackend, ReconcileReport, Reconciler, SceneModel,
    SceneMutation,
};
use mathboard_shared::{Element, ElementId, ElementKind};

fn setup() -> (Reconciler, MemoryBackend) {
    let _ = env_logger::builder().is_test(true).try_init();
    (Reconciler::new(), MemoryBackend::default())
}

fn circle_scene(circle_first: bool) -> SceneModel {
    let point = Element::point("P", 1.0, 2.0).with_prop("name", "P");
    let circle = Element::new("c", ElementKind::Circle, vec!["P".into(), 3.0.into()]);
    let elements = if circle_first {
        vec![circle, point]
    } else {
        vec![point, circle]
    };
    SceneModel::from_elements(elements).unwrap()
}

fn live_ids(backend: &MemoryBackend, ids: &[&str]) -> Vec<bool> {
    ids.iter()
        .map(|id| backend.find(&ElementId::from(*id)).is_some())
        .collect()
}

#[test]
fn test_second_pass_over_unchanged_model_is_noop() {
    let (mut reconciler, mut backend) = setup();
    let model = SceneModel::from_elements(vec![
        Element::point("A", 0.0, 0.0),
        Element::point("B", 4.0, 0.0),
        Element::point("C", 0.0, 3.0),
        Element::new("ab", ElementKind::Segment, vec!["A".into(), "B".into()]),
        Element::new(
            "tri",
            ElementKind::Polygon,
            vec!["A".into(), "B".into(), "C".into()],
        ),
        Element::new("label", ElementKind::Text, vec![1.0.into(), 1.0.into()])
            .with_prop("text", "area 6"),
    ])
    .unwrap();

    let first = reconciler.reconcile(&model, &mut backend, None);
    assert_eq!(first.created.len(), 6);

    backend.reset_ops();
    let second = reconciler.reconcile(&model, &mut backend, None);

    assert!(second.is_noop(), "second pass did work: {second:?}");
    assert_eq!(backend.ops().mutations(), 0);
}

#[test]
fn test_child_before_parent_yields_same_graph() {
    let (mut forward, mut forward_backend) = setup();
    let (mut reversed, mut reversed_backend) = setup();

    forward.reconcile(&circle_scene(false), &mut forward_backend, None);
    let report = reversed.reconcile(&circle_scene(true), &mut reversed_backend, None);

    assert!(report.deferred.is_empty());
    assert_eq!(
        reversed_backend.creation_order(),
        &[ElementId::from("P"), ElementId::from("c")]
    );
    assert_eq!(forward_backend.creation_order(), reversed_backend.creation_order());

    let (_, circle) = reversed_backend.find(&"c".into()).unwrap();
    let (center, _) = reversed_backend.find(&"P".into()).unwrap();
    assert_eq!(
        circle.parents,
        vec![
            mathboard_scene::ResolvedParent::Object(center),
            mathboard_scene::ResolvedParent::Number(3.0)
        ]
    );
}

#[test]
fn test_cascade_delete_is_realized_by_next_pass() {
    let (mut reconciler, mut backend) = setup();
    let mut model = SceneModel::from_elements(vec![
        Element::point("P", 0.0, 0.0),
        Element::point("Q", 2.0, 0.0),
        Element::point("R", 1.0, 2.0),
        Element::point("R'", 5.0, 5.0),
        Element::new("s", ElementKind::Segment, vec!["P".into(), "Q".into()]),
        Element::new(
            "poly",
            ElementKind::Polygon,
            vec!["P".into(), "Q".into(), "R".into()],
        ),
    ])
    .unwrap();
    reconciler.reconcile(&model, &mut backend, None);

    model.apply(SceneMutation::Delete { id: "R'".into() }).unwrap();
    let report = reconciler.reconcile(&model, &mut backend, None);
    assert_eq!(report.removed, vec![ElementId::from("R'")]);
    assert_eq!(backend.len(), 5);

    let removed = model.delete_cascade(&"P".into()).unwrap();
    assert_eq!(removed.len(), 3);
    let report = reconciler.reconcile(&model, &mut backend, None);

    assert_eq!(report.removed.len(), 3);
    // Dependents go before the point they hang on
    assert_eq!(report.removed.last(), Some(&ElementId::from("P")));
    assert_eq!(live_ids(&backend, &["P", "s", "poly", "Q", "R"]), [false, false, false, true, true]);
}

#[test]
fn test_locked_element_keeps_live_position_until_released() {
    let (mut reconciler, mut backend) = setup();
    let mut model = SceneModel::from_elements(vec![Element::point("X", 0.0, 0.0)]).unwrap();
    reconciler.reconcile(&model, &mut backend, None);
    let handle = reconciler.handle(&"X".into()).unwrap();

    // The gesture has moved the live point
    backend.move_point(handle, 2.0, 2.0).unwrap();
    model.set_point_position(&"X".into(), 7.0, 7.0).unwrap();

    let locked = ElementId::from("X");
    let report = reconciler.reconcile(&model, &mut backend, Some(&locked));
    assert_eq!(report.skipped_locked, vec![locked.clone()]);
    assert_eq!(backend.point_position(handle), Some((2.0, 2.0)));

    // Gesture over
    let report = reconciler.reconcile(&model, &mut backend, None);
    assert_eq!(report.updated, vec![locked]);
    assert_eq!(backend.point_position(handle), Some((7.0, 7.0)));
    assert_eq!(reconciler.handle(&"X".into()), Some(handle));
}

#[test]
fn test_position_update_preserves_identity() {
    let (mut reconciler, mut backend) = setup();
    let mut model = circle_scene(false);
    reconciler.reconcile(&model, &mut backend, None);
    let point = reconciler.handle(&"P".into()).unwrap();
    let circle = reconciler.handle(&"c".into()).unwrap();

    backend.reset_ops();
    model.set_point_position(&"P".into(), -1.0, -1.0).unwrap();
    let report = reconciler.reconcile(&model, &mut backend, None);

    assert_eq!(report.updated, vec![ElementId::from("P")]);
    assert!(report.created.is_empty() && report.removed.is_empty());
    assert_eq!(reconciler.handle(&"P".into()), Some(point));
    assert_eq!(reconciler.handle(&"c".into()), Some(circle));
    assert_eq!(
        backend.ops(),
        BackendOps {
            moves: 1,
            paints: 1,
            ..BackendOps::default()
        }
    );
}

#[test]
fn test_creation_config_is_not_reapplied() {
    let (mut reconciler, mut backend) = setup();
    let mut model = SceneModel::from_elements(vec![
        Element::point("A", 0.0, 0.0).with_prop("strokeColor", "red"),
    ])
    .unwrap();
    reconciler.reconcile(&model, &mut backend, None);

    model
        .replace_all(vec![Element::point("A", 0.0, 0.0).with_prop("strokeColor", "blue")])
        .unwrap();
    let report = reconciler.reconcile(&model, &mut backend, None);

    assert!(report.is_noop());
    let (_, object) = backend.find(&"A".into()).unwrap();
    assert_eq!(object.props["strokeColor"], "red");
}

#[test]
fn test_visibility_is_a_mutable_field() {
    let (mut reconciler, mut backend) = setup();
    let mut model = circle_scene(false);
    reconciler.reconcile(&model, &mut backend, None);

    model.set_visibility(&"c".into(), false).unwrap();
    let report = reconciler.reconcile(&model, &mut backend, None);

    assert_eq!(report.updated, vec![ElementId::from("c")]);
    assert!(!backend.find(&"c".into()).unwrap().1.visible);
}

#[test]
fn test_structural_change_rebuilds_element_and_dependents() {
    let (mut reconciler, mut backend) = setup();
    let mut model = SceneModel::from_elements(vec![
        Element::point("A", 0.0, 0.0),
        Element::point("B", 3.0, 0.0),
        Element::point("C", 0.0, 3.0),
        Element::new("s", ElementKind::Segment, vec!["A".into(), "B".into()]),
        Element::new("m", ElementKind::Text, vec!["s".into()]),
    ])
    .unwrap();
    reconciler.reconcile(&model, &mut backend, None);
    let a = reconciler.handle(&"A".into());

    let mut elements = model.elements().to_vec();
    elements[3] = Element::new("s", ElementKind::Segment, vec!["A".into(), "C".into()]);
    model.replace_all(elements).unwrap();
    let report = reconciler.reconcile(&model, &mut backend, None);

    assert_eq!(report.removed, vec![ElementId::from("m"), ElementId::from("s")]);
    assert_eq!(report.created, vec![ElementId::from("s"), ElementId::from("m")]);
    assert_eq!(reconciler.handle(&"A".into()), a);
}

#[test]
fn test_missing_parent_defers_and_retries() {
    let (mut reconciler, mut backend) = setup();
    let mut model = SceneModel::from_elements(vec![
        Element::point("A", 0.0, 0.0),
        Element::new("s", ElementKind::Segment, vec!["A".into(), "B".into()]),
    ])
    .unwrap();

    let report = reconciler.reconcile(&model, &mut backend, None);
    assert_eq!(report.created, vec![ElementId::from("A")]);
    assert_eq!(report.deferred, vec![ElementId::from("s")]);
    assert!(report.failed.is_empty());

    model.insert(Element::point("B", 1.0, 1.0)).unwrap();

    let report = reconciler.reconcile(&model, &mut backend, None);
    assert_eq!(report.created, vec![ElementId::from("B"), ElementId::from("s")]);
    assert!(report.deferred.is_empty());
}

#[test]
fn test_render_error_does_not_block_other_elements() {
    let (mut reconciler, mut backend) = setup();
    backend.fail_on("bad");
    let model = SceneModel::from_elements(vec![
        Element::point("A", 0.0, 0.0),
        Element::point("bad", 1.0, 1.0),
        Element::point("C", 2.0, 2.0),
        Element::new("s", ElementKind::Segment, vec!["A".into(), "bad".into()]),
        Element::new("t", ElementKind::Segment, vec!["A".into(), "C".into()]),
    ])
    .unwrap();

    let report: ReconcileReport = reconciler.reconcile(&model, &mut backend, None);

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, ElementId::from("bad"));
    assert_eq!(report.deferred, vec![ElementId::from("s")]);
    assert_eq!(report.created.len(), 3);
    assert_eq!(backend.len(), 3);
}

#[test]
fn test_full_replacement_removes_superseded_scene() {
    let (mut reconciler, mut backend) = setup();
    let mut model = circle_scene(false);
    reconciler.reconcile(&model, &mut backend, None);

    model
        .replace_all(vec![Element::new(
            "f0",
            ElementKind::Curve,
            vec![],
        )
        .with_prop("fn", "Math.sin(x)")])
        .unwrap();
    let report = reconciler.reconcile(&model, &mut backend, None);

    assert_eq!(report.removed, vec![ElementId::from("c"), ElementId::from("P")]);
    assert_eq!(report.created, vec![ElementId::from("f0")]);
    assert_eq!(backend.len(), 1);
}

#[test]
fn test_pass_paints_once() {
    let (mut reconciler, mut backend) = setup();
    let model = circle_scene(false);
    reconciler.reconcile(&model, &mut backend, None);

    assert_eq!(backend.ops().paints, 1);
    assert!(!backend.is_suspended());
}
