#[cfg(test)]
mod proptests {
    use crate::hours::OperatingHours;
    use crate::logic::{compute_slots, TimePreferences, MAX_SLOTS, SLOT_STEP_MINUTES};
    use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
    use chrono_tz::Tz;
    use proptest::prelude::*;
    use slotify_common::services::BusyInterval;

    const TZ: Tz = chrono_tz::Asia::Singapore;

    fn window_start() -> DateTime<Utc> {
        TZ.with_ymd_and_hms(2026, 2, 2, 0, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    prop_compose! {
        fn arb_busy_interval()(
            offset_min in 0i64..(14 * 24 * 60),
            length_min in 5i64..240,
        ) -> BusyInterval {
            let start = window_start() + Duration::minutes(offset_min);
            BusyInterval {
                id: format!("evt-{}", offset_min),
                start,
                end: start + Duration::minutes(length_min),
            }
        }
    }

    proptest! {
        #[test]
        fn output_is_chronological_and_capped(
            busy in prop::collection::vec(arb_busy_interval(), 0..8),
            duration_min in 15i64..=120,
            morning in any::<bool>(),
            afternoon in any::<bool>(),
        ) {
            let now = window_start();
            let slots = compute_slots(
                &OperatingHours::default_schedule(),
                TZ,
                now,
                now,
                now + Duration::days(14),
                duration_min,
                &busy,
                &TimePreferences { morning, afternoon },
            );

            prop_assert!(slots.len() <= MAX_SLOTS);
            for pair in slots.windows(2) {
                prop_assert!(pair[0].start_at <= pair[1].start_at);
            }
        }

        #[test]
        fn accepted_slots_pass_every_filter(
            busy in prop::collection::vec(arb_busy_interval(), 0..8),
            duration_min in 15i64..=120,
            morning in any::<bool>(),
            afternoon in any::<bool>(),
        ) {
            let now = window_start() + Duration::hours(30);
            let slots = compute_slots(
                &OperatingHours::default_schedule(),
                TZ,
                now,
                window_start(),
                window_start() + Duration::days(14),
                duration_min,
                &busy,
                &TimePreferences { morning, afternoon },
            );

            for slot in &slots {
                prop_assert!(slot.start_at >= now);

                let local = slot.start_at.with_timezone(&TZ);
                // Sunday is closed in the default schedule
                prop_assert!(slot.day != "Sunday");
                if morning {
                    prop_assert!(local.hour() < 12);
                }
                if afternoon {
                    prop_assert!(local.hour() >= 12);
                }
                // Start times land on the fixed step grid
                prop_assert_eq!(i64::from(local.minute()) % SLOT_STEP_MINUTES, 0);

                let end = slot.start_at + Duration::minutes(duration_min);
                for block in &busy {
                    let overlaps = (slot.start_at > block.start && slot.start_at < block.end)
                        || (end > block.start && end < block.end)
                        || (slot.start_at < block.start && end > block.end);
                    prop_assert!(!overlaps);
                }
            }
        }

        #[test]
        fn regeneration_is_deterministic(
            busy in prop::collection::vec(arb_busy_interval(), 0..8),
            duration_min in 15i64..=120,
        ) {
            let now = window_start();
            let run = || compute_slots(
                &OperatingHours::default_schedule(),
                TZ,
                now,
                now,
                now + Duration::days(14),
                duration_min,
                &busy,
                &TimePreferences::default(),
            );
            prop_assert_eq!(run(), run());
        }
    }
}
