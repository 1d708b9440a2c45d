//! Link visibility evaluation
//!
//! A pure predicate evaluated per request against the current time, so a
//! scheduled link disappears and reappears at its boundary with no
//! background job involved.

use crate::models::{Link, RotationType};

/// Decide whether a link should be rendered at `now_ms` (Unix milliseconds).
///
/// Schedule bounds are inclusive on both ends; a missing bound is
/// unbounded on that side. A scheduled link with neither bound set is
/// always visible, which differs from `Always` only in name.
pub fn is_visible(link: &Link, now_ms: i64) -> bool {
    if !link.is_active {
        return false;
    }

    match link.rotation_type {
        RotationType::Always | RotationType::Random | RotationType::Weighted => true,
        RotationType::Scheduled => {
            let after_start = link.schedule_start.map_or(true, |start| now_ms >= start);
            let before_end = link.schedule_end.map_or(true, |end| now_ms <= end);
            after_start && before_end
        }
    }
}

/// Filter a link set down to the links visible at `now_ms`, preserving
/// display order. Ordering/emphasis among random and weighted links is
/// left to the renderer.
pub fn visible_links(links: Vec<Link>, now_ms: i64) -> Vec<Link> {
    links
        .into_iter()
        .filter(|link| is_visible(link, now_ms))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(rotation_type: RotationType) -> Link {
        Link {
            id: 1,
            user_id: 1,
            title: "Test".to_string(),
            url: "https://example.com".to_string(),
            icon: None,
            type_id: None,
            rotation_type,
            weight: None,
            schedule_start: None,
            schedule_end: None,
            is_active: true,
            position: 1,
            category: None,
            tags: None,
            created_at: 0,
        }
    }

    const JAN_1: i64 = 1_735_689_600_000;
    const JAN_15: i64 = 1_736_899_200_000;
    const JAN_31: i64 = 1_738_281_600_000;
    const FEB_1: i64 = 1_738_368_000_000;

    #[test]
    fn always_follows_active_flag() {
        let mut l = link(RotationType::Always);
        assert!(is_visible(&l, JAN_15));
        l.is_active = false;
        assert!(!is_visible(&l, JAN_15));
    }

    #[test]
    fn random_and_weighted_are_not_gated() {
        assert!(is_visible(&link(RotationType::Random), JAN_15));
        let mut weighted = link(RotationType::Weighted);
        weighted.weight = Some(40);
        assert!(is_visible(&weighted, JAN_15));
    }

    #[test]
    fn scheduled_window_is_inclusive() {
        let mut l = link(RotationType::Scheduled);
        l.schedule_start = Some(JAN_1);
        l.schedule_end = Some(JAN_31);

        assert!(is_visible(&l, JAN_15));
        assert!(is_visible(&l, JAN_1));
        assert!(is_visible(&l, JAN_31));
        assert!(!is_visible(&l, FEB_1));
        assert!(!is_visible(&l, JAN_1 - 1));
    }

    #[test]
    fn scheduled_open_bounds() {
        let mut l = link(RotationType::Scheduled);
        l.schedule_end = Some(JAN_31);
        assert!(is_visible(&l, JAN_1));
        assert!(!is_visible(&l, FEB_1));

        l.schedule_start = Some(JAN_1);
        l.schedule_end = None;
        assert!(is_visible(&l, FEB_1));
        assert!(!is_visible(&l, JAN_1 - 1));

        // Both bounds absent: always on.
        l.schedule_start = None;
        assert!(is_visible(&l, JAN_15));
    }

    #[test]
    fn scheduled_inactive_overrides_window() {
        let mut l = link(RotationType::Scheduled);
        l.schedule_start = Some(JAN_1);
        l.schedule_end = Some(JAN_31);
        l.is_active = false;
        assert!(!is_visible(&l, JAN_15));
    }

    #[test]
    fn visible_links_preserves_order() {
        let mut a = link(RotationType::Always);
        a.id = 1;
        a.position = 1;
        let mut b = link(RotationType::Scheduled);
        b.id = 2;
        b.position = 2;
        b.schedule_end = Some(JAN_1);
        let mut c = link(RotationType::Random);
        c.id = 3;
        c.position = 3;

        let visible = visible_links(vec![a, b, c], JAN_15);
        let ids: Vec<i64> = visible.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
