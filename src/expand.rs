//! Expansion of one master event into its concrete instances for a time window

use log::warn;

use crate::event::Event;
use crate::instance::EventInstance;
use crate::rrule;
use crate::window::TimeWindow;

/// Turn one master event into the instances that fall within `window`, in
/// ascending start order.
///
/// A non-recurring master is emitted as a single instance iff its interval
/// strictly overlaps the window. A recurring master is evaluated over a window
/// whose lower bound is widened by the master's own duration, so occurrences that
/// begin before the window but are still running when it opens are not missed;
/// each candidate is then re-tested against the original window, which also drops
/// the artifacts the widening may introduce.
///
/// A malformed recurrence rule does not fail the expansion: the master degrades to
/// a single, non-recurring instance anchored at its own start time, and the parse
/// failure is only logged. This keeps one broken rule from taking down a whole
/// range query.
pub fn expand(master: &Event, window: &TimeWindow) -> Vec<EventInstance> {
    let rule_text = match master.recurrence_rule() {
        None => return expand_single(master, window),
        Some(rule_text) => rule_text,
    };

    let duration = master.duration();
    let evaluation_window = window.widened_down_by(duration);

    let starts = match rrule::occurrences_between(
        rule_text,
        master.start_time(),
        evaluation_window.start(),
        evaluation_window.end(),
    ) {
        Ok(starts) => starts,
        Err(err) => {
            warn!(
                "Unparseable recurrence rule on event {} ({}). Treating it as non-recurring",
                master.id(),
                err
            );
            return expand_single(master, window);
        }
    };

    starts
        .into_iter()
        .filter_map(|resolved_start| {
            let resolved_end = resolved_start + duration;
            if window.overlaps(resolved_start, resolved_end) {
                Some(EventInstance::Occurrence {
                    master: master.clone(),
                    resolved_start,
                    resolved_end,
                })
            } else {
                None
            }
        })
        .collect()
}

/// The non-recurring path: the master itself, iff it strictly overlaps the window
fn expand_single(master: &Event, window: &TimeWindow) -> Vec<EventInstance> {
    if window.overlaps(master.start_time(), master.end_time()) {
        vec![EventInstance::Single(master.clone())]
    } else {
        Vec::new()
    }
}
