//! Balancing algorithms.
//!
//! Pure functions over an eligible node list and a rotation cursor; the
//! caller holds the registry lock for the duration of the call.

use crate::destination::AvailableDestination;
use crate::routing::RoutingStrategy;

/// Order `available` for one connection according to `strategy`, moving the
/// cursor as the strategy requires.
///
/// An empty input yields an empty output and leaves the cursor untouched.
pub fn balance(
    strategy: RoutingStrategy,
    available: &[AvailableDestination],
    start_pos: &mut usize,
) -> Vec<AvailableDestination> {
    if available.is_empty() {
        return Vec::new();
    }

    let len = available.len();
    let pos = *start_pos % len;
    if strategy.rotates() {
        *start_pos = (pos + 1) % len;
        return rotated(available, pos);
    }

    match strategy {
        RoutingStrategy::NextAvailable => {
            *start_pos = pos;
            rotated(available, pos)
        }
        _ => available.to_vec(),
    }
}

/// Move the cursor past `n` consumed destinations of a `len`-long eligible
/// set. The cursor stays below `len`.
pub fn advance(start_pos: &mut usize, n: usize, len: usize) {
    if len > 0 {
        *start_pos = (*start_pos % len + n % len) % len;
    }
}

fn rotated(available: &[AvailableDestination], pos: usize) -> Vec<AvailableDestination> {
    available[pos..]
        .iter()
        .chain(&available[..pos])
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::TcpAddress;

    fn nodes(ids: &[&str]) -> Vec<AvailableDestination> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| AvailableDestination::new(TcpAddress::new("h", 3306 + i as u16), *id))
            .collect()
    }

    fn order(
        strategy: RoutingStrategy,
        available: &[AvailableDestination],
        pos: &mut usize,
    ) -> Vec<String> {
        balance(strategy, available, pos)
            .into_iter()
            .map(|d| d.id)
            .collect()
    }

    #[test]
    fn test_round_robin_rotates() {
        let available = nodes(&["a", "b", "c"]);
        let mut pos = 0;

        let rr = RoutingStrategy::RoundRobin;
        assert_eq!(order(rr, &available, &mut pos), ["a", "b", "c"]);
        assert_eq!(order(rr, &available, &mut pos), ["b", "c", "a"]);
        assert_eq!(order(rr, &available, &mut pos), ["c", "a", "b"]);
        assert_eq!(order(rr, &available, &mut pos), ["a", "b", "c"]);
    }

    #[test]
    fn test_first_available_is_stable() {
        let available = nodes(&["a", "b"]);
        let mut pos = 1;
        for _ in 0..3 {
            assert_eq!(
                order(RoutingStrategy::FirstAvailable, &available, &mut pos),
                ["a", "b"]
            );
        }
        assert_eq!(pos, 1);
    }

    #[test]
    fn test_next_available_moves_only_on_advance() {
        let available = nodes(&["a", "b", "c"]);
        let mut pos = 0;

        let next = RoutingStrategy::NextAvailable;
        assert_eq!(order(next, &available, &mut pos), ["a", "b", "c"]);
        assert_eq!(order(next, &available, &mut pos), ["a", "b", "c"]);

        advance(&mut pos, 1, available.len());
        assert_eq!(order(next, &available, &mut pos), ["b", "c", "a"]);
    }

    #[test]
    fn test_cursor_past_end_is_wrapped() {
        let available = nodes(&["a", "b"]);
        let mut pos = 4;
        assert_eq!(order(RoutingStrategy::RoundRobin, &available, &mut pos), ["a", "b"]);
        assert_eq!(pos, 1);
    }

    #[test]
    fn test_advance_keeps_cursor_bounded() {
        let mut pos = 2;
        advance(&mut pos, usize::MAX, 3);
        assert_eq!(pos, (2 + usize::MAX % 3) % 3);

        for _ in 0..10 {
            advance(&mut pos, 7, 3);
            assert!(pos < 3);
        }

        // nothing eligible, nothing to skip
        let mut pos = 5;
        advance(&mut pos, 4, 0);
        assert_eq!(pos, 5);
    }

    #[test]
    fn test_empty_leaves_cursor() {
        let mut pos = 3;
        assert!(balance(RoutingStrategy::RoundRobin, &[], &mut pos).is_empty());
        assert_eq!(pos, 3);
    }
}
