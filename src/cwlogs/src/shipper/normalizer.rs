use super::event::LogEvent;

/// Prepares a batch for the service, which rejects writes whose events go back
/// in time: sorts by timestamp (stable) and raises every event older than
/// `last_accepted` to `last_accepted`.
///
/// Returns the timestamp of the newest event, which becomes the floor for the
/// next batch once this one is accepted.
pub fn normalize(batch: &mut [LogEvent], last_accepted: Option<i64>) -> Option<i64> {
    batch.sort_by_key(|event| event.timestamp);

    if let Some(floor) = last_accepted {
        for event in batch.iter_mut() {
            if event.timestamp >= floor {
                break;
            }
            event.timestamp = floor;
        }
    }

    batch.last().map(|event| event.timestamp).or(last_accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn batch(timestamps: &[i64]) -> Vec<LogEvent> {
        timestamps
            .iter()
            .enumerate()
            .map(|(i, ts)| LogEvent::new(*ts, format!("m{}", i)))
            .collect()
    }

    fn timestamps(batch: &[LogEvent]) -> Vec<i64> {
        batch.iter().map(|e| e.timestamp).collect()
    }

    #[rstest]
    #[case::unsorted_without_floor(&[5, 1, 3], None, &[1, 3, 5], Some(5))]
    #[case::sorted_with_zero_floor(&[5, 1, 3], Some(0), &[1, 3, 5], Some(5))]
    #[case::all_below_floor(&[2, 4], Some(10), &[10, 10], Some(10))]
    #[case::partially_below_floor(&[12, 3, 9, 15], Some(10), &[10, 10, 12, 15], Some(15))]
    #[case::equal_to_floor(&[10, 10], Some(10), &[10, 10], Some(10))]
    #[case::negative_timestamps(&[-5, -10], None, &[-10, -5], Some(-5))]
    fn normalizes_batches(
        #[case] input: &[i64],
        #[case] last_accepted: Option<i64>,
        #[case] expected: &[i64],
        #[case] expected_last: Option<i64>,
    ) {
        let mut events = batch(input);
        let last = normalize(&mut events, last_accepted);
        assert_eq!(timestamps(&events), expected);
        assert_eq!(last, expected_last);
    }

    #[test]
    fn sort_is_stable_for_equal_timestamps() {
        let mut events = vec![
            LogEvent::new(2, "first"),
            LogEvent::new(1, "early"),
            LogEvent::new(2, "second"),
            LogEvent::new(2, "third"),
        ];
        normalize(&mut events, None);

        let messages: Vec<_> = events.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["early", "first", "second", "third"]);
    }

    #[test]
    fn empty_batch_keeps_previous_floor() {
        let mut events: Vec<LogEvent> = Vec::new();
        assert_eq!(normalize(&mut events, Some(42)), Some(42));
        assert_eq!(normalize(&mut events, None), None);
    }

    #[test]
    fn output_is_sorted_and_above_floor_for_shuffled_input() {
        // deterministic pseudo-random input
        let mut seed: i64 = 7;
        let input: Vec<i64> = (0..500)
            .map(|_| {
                seed = (seed * 1_103_515_245 + 12_345) % 2_147_483_648;
                seed % 10_000
            })
            .collect();
        let floor = 5_000;

        let mut events = batch(&input);
        let last = normalize(&mut events, Some(floor));

        assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(events.iter().all(|e| e.timestamp >= floor));
        assert_eq!(last, events.last().map(|e| e.timestamp));
    }
}
