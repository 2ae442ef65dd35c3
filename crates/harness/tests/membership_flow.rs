use syncline_harness::{Call, Circle, TestClient};

// ============================================================================
// Optimistic edits (7 tests)
// ============================================================================

#[test]
fn join_shows_in_view_before_any_ack() {
    let mut client = TestClient::with_circles(&[("c1", Circle::new("Climbing", false))]);

    client.join("c1");

    // The view flips immediately; the base still holds the server truth.
    assert!(client.view()["c1"].joined);
    assert!(!client.replica.base()["c1"].joined);
    assert!(matches!(client.service.calls(), [Call::Action(_)]));
    assert!(client.replica.has_outstanding());
}

#[test]
fn join_then_leave_lands_on_leave() {
    let mut client = TestClient::with_circles(&[("c1", Circle::new("Climbing", false))]);

    client.join("c1");
    client.leave("c1");

    assert!(!client.view()["c1"].joined);
    assert_eq!(client.service.in_flight(), 2);
}

#[test]
fn create_and_delete_apply_in_order() {
    let mut client = TestClient::new();

    client.create_circle("c1", Circle::new("Reading", true));
    assert!(client.view().contains_key("c1"));

    client.delete_circle("c1");
    assert!(!client.view().contains_key("c1"));
}

#[test]
fn later_writes_shadow_earlier_ones() {
    let mut client = TestClient::new();

    client.create_circle("c1", Circle::new("First", false));
    client.create_circle("c1", Circle::new("Second", true));

    let view = client.view();
    assert_eq!(view["c1"], Circle::new("Second", true));
}

#[test]
fn join_on_unknown_circle_is_invisible() {
    let mut client = TestClient::with_circles(&[("c1", Circle::new("Climbing", false))]);

    // The modify addresses a circle the snapshot does not have.
    client.join("c9");

    assert_eq!(client.view().len(), 1);
    assert!(!client.view().contains_key("c9"));
}

#[test]
fn view_is_stable_across_reads() {
    let mut client = TestClient::with_circles(&[("c1", Circle::new("Climbing", false))]);
    client.join("c1");
    client.create_circle("c2", Circle::new("Cooking", true));
    client.start_refresh();
    client.delete_circle("c1");

    assert_eq!(client.view(), client.view());
}

#[test]
fn acks_do_not_change_the_view() {
    let mut client = TestClient::with_circles(&[("c1", Circle::new("Climbing", false))]);

    let join = client.join("c1");
    let before = client.view();

    // Confirmation is bookkeeping; only pruning after a refresh removes
    // anything, and applying a confirmed change is harmlessly redundant.
    assert!(client.resolve_action(join));
    assert_eq!(client.view(), before);
    assert!(!client.replica.has_outstanding());
    assert!(!client.replica.is_settled());
}
