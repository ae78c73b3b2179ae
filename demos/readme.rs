use windowed_event_counter::{Clock, EventCounter, ManualClock, Window, MILLIS_IN_24_HOURS};

fn main() {
    // Typically you want `EventCounter::new()`, which reads the wall clock
    let clock = ManualClock::new(1_700_000_000_000);
    let counter = EventCounter::with_clock(&clock);

    counter.insert("request");

    clock.advance(1_000); // Simulate a second passing
    counter.insert("request");

    assert_eq!(counter.count(Window::Minute), 2);

    // Backfill an event from ten seconds ago
    let earlier = clock.now_millis() - 10_000;
    counter.insert_at("request", earlier).unwrap();
    assert_eq!(counter.count_in_last_minute(), 3);

    // Too old: outside the trailing day
    assert!(counter.insert_at("request", earlier - MILLIS_IN_24_HOURS).is_err());

    clock.advance(MILLIS_IN_24_HOURS); // Move forward...
    counter.insert("request");
    // The counter forgot about the events older than one day
    assert_eq!(counter.count_in_last_day(), 1);
}
