use flashsim_events::{EventQueue, HandlerRegistry};

#[test]
fn events_dispatch_in_time_order() {
    let mut q = EventQueue::new();
    q.schedule_at(30, "c");
    q.schedule_at(10, "a");
    q.schedule_at(20, "b");

    let mut order = Vec::new();
    while let Some((_, ev)) = q.pop_next(None) {
        order.push((q.now_us(), ev));
    }
    assert_eq!(order, vec![(10, "a"), (20, "b"), (30, "c")]);
}

#[test]
fn equal_time_events_dispatch_in_schedule_order() {
    let mut q = EventQueue::new();
    for label in ["first", "second", "third", "fourth"] {
        q.schedule_at(100, label);
    }

    let mut order = Vec::new();
    while let Some((_, ev)) = q.pop_next(None) {
        order.push(ev);
    }
    assert_eq!(order, vec!["first", "second", "third", "fourth"]);
}

#[test]
fn canceled_event_never_fires() {
    let mut q = EventQueue::new();
    q.schedule_at(10, "keep");
    let doomed = q.schedule_at(20, "cancel");
    q.schedule_at(30, "keep");
    q.cancel(doomed);

    let mut seen = Vec::new();
    while let Some((_, ev)) = q.pop_next(None) {
        seen.push(ev);
    }
    assert_eq!(seen, vec!["keep", "keep"]);
}

#[test]
fn cancel_is_a_tombstone_not_a_removal() {
    let mut q = EventQueue::new();
    let id = q.schedule_at(10, ());
    q.cancel(id);
    // The entry is still queued until it surfaces at the head.
    assert_eq!(q.len(), 1);
    assert_eq!(q.pop_next(None), None);
    assert!(q.is_empty());
}

#[test]
fn pop_stops_at_until_without_losing_events() {
    let mut q = EventQueue::new();
    q.schedule_at(10, "early");
    q.schedule_at(500, "late");

    assert_eq!(q.pop_next(Some(100)), Some((0, "early")));
    assert_eq!(q.now_us(), 10);
    // The late event is beyond the bound: not dispatched, not dropped.
    assert_eq!(q.pop_next(Some(100)), None);
    assert_eq!(q.len(), 1);

    // A later unbounded run resumes where the bounded one stopped.
    assert_eq!(q.pop_next(None), Some((1, "late")));
    assert_eq!(q.now_us(), 500);
}

#[test]
fn event_exactly_at_until_still_dispatches() {
    let mut q = EventQueue::new();
    q.schedule_at(100, ());
    assert!(q.pop_next(Some(100)).is_some());
}

#[test]
fn clock_advances_only_at_dispatch() {
    let mut q = EventQueue::new();
    q.schedule_at(40, ());
    assert_eq!(q.now_us(), 0);
    q.pop_next(None);
    assert_eq!(q.now_us(), 40);
}

#[test]
fn handlers_may_schedule_at_the_current_time() {
    let mut q = EventQueue::new();
    q.schedule_at(10, "outer");
    let (_, _) = q.pop_next(None).unwrap();
    // Completion events are published "at the current time" by handlers.
    q.schedule_at(q.now_us(), "inner");
    assert_eq!(q.pop_next(None), Some((1, "inner")));
    assert_eq!(q.now_us(), 10);
}

#[test]
#[should_panic(expected = "behind current time")]
fn scheduling_into_the_past_panics() {
    let mut q = EventQueue::new();
    q.schedule_at(50, ());
    q.pop_next(None);
    q.schedule_at(10, ());
}

#[test]
fn second_handler_for_same_kind_collides() {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        Arrival,
        Completion,
    }
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Owner {
        Harness,
        Cache,
    }

    let mut reg = HandlerRegistry::new();
    reg.register(Kind::Arrival, Owner::Harness).unwrap();
    reg.register(Kind::Completion, Owner::Harness).unwrap();

    let err = reg.register(Kind::Arrival, Owner::Cache).unwrap_err();
    assert!(err.kind.contains("Arrival"));
    // The first registration stays in place.
    assert_eq!(reg.lookup(Kind::Arrival), Some(Owner::Harness));
}
