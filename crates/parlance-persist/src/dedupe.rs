use parlance_types::Thread;
use uuid::Uuid;

/// Drop empty threads until at most one remains.
///
/// The survivor is `preferred` when that thread is empty, otherwise the
/// first empty thread in order. Non-empty threads are never touched.
/// Returns how many threads were removed.
pub fn dedupe_empty_threads(threads: &mut Vec<Thread>, preferred: Option<Uuid>) -> usize {
    let keep = preferred
        .filter(|id| threads.iter().any(|t| t.id == *id && t.is_empty()))
        .or_else(|| threads.iter().find(|t| t.is_empty()).map(|t| t.id));

    let before = threads.len();
    threads.retain(|t| !t.is_empty() || Some(t.id) == keep);
    before - threads.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlance_types::Message;

    fn full(text: &str) -> Thread {
        let mut thread = Thread::new();
        thread.set_messages(vec![Message::user(text)]);
        thread
    }

    #[test]
    fn test_keeps_one_empty_and_all_full_threads() {
        let a = full("a");
        let e1 = Thread::new();
        let b = full("b");
        let e2 = Thread::new();
        let e3 = Thread::new();
        let mut threads = vec![a.clone(), e1.clone(), b.clone(), e2, e3];

        let removed = dedupe_empty_threads(&mut threads, None);

        assert_eq!(removed, 2);
        assert_eq!(threads, vec![a, e1, b]);
    }

    #[test]
    fn test_three_empty_threads_collapse_to_one() {
        let kept = full("kept");
        let mut threads = vec![Thread::new(), Thread::new(), kept.clone(), Thread::new()];

        dedupe_empty_threads(&mut threads, None);

        assert_eq!(threads.iter().filter(|t| t.is_empty()).count(), 1);
        assert_eq!(threads.iter().filter(|t| !t.is_empty()).collect::<Vec<_>>(), vec![&kept]);
    }

    #[test]
    fn test_prefers_open_empty_thread() {
        let e1 = Thread::new();
        let e2 = Thread::new();
        let mut threads = vec![e1, e2.clone()];

        dedupe_empty_threads(&mut threads, Some(e2.id));

        assert_eq!(threads, vec![e2]);
    }

    #[test]
    fn test_preferred_full_thread_falls_back_to_first_empty() {
        let a = full("a");
        let e1 = Thread::new();
        let e2 = Thread::new();
        let mut threads = vec![e1.clone(), a.clone(), e2];

        dedupe_empty_threads(&mut threads, Some(a.id));

        assert_eq!(threads, vec![e1, a]);
    }

    #[test]
    fn test_no_empty_threads_is_untouched() {
        let mut threads = vec![full("a"), full("b")];
        let expected = threads.clone();
        assert_eq!(dedupe_empty_threads(&mut threads, None), 0);
        assert_eq!(threads, expected);
    }
}
