//! Transfer-to-human intent detection.

const TRANSFER_KEYWORDS: &[&str] = &[
    "转人工",
    "人工客服",
    "人工服务",
    "真人",
    "投诉",
    "human agent",
    "real person",
    "talk to a human",
    "speak to a human",
    "live agent",
];

const FRUSTRATION_MARKERS: &[&str] = &[
    "没用",
    "不对",
    "听不懂",
    "还是不行",
    "答非所问",
    "useless",
    "not helpful",
    "doesn't help",
    "does not help",
    "wrong answer",
    "that's wrong",
];

const HISTORY_WINDOW: usize = 5;
const FRUSTRATION_TRIGGER: usize = 2;
const REPEAT_TRIGGER: usize = 3;

/// Why a query was routed to a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferReason {
    Keyword,
    Frustration,
    RepeatedQuestion,
}

fn normalize(text: &str) -> String {
    text.trim()
        .trim_end_matches(['?', '？', '!', '！', '.', '。'])
        .to_lowercase()
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

/// Checks the query and recent user turns (oldest first) for a handoff request.
pub fn detect_transfer(query: &str, history: &[String]) -> Option<TransferReason> {
    let query_norm = normalize(query);
    if contains_any(&query_norm, TRANSFER_KEYWORDS) {
        return Some(TransferReason::Keyword);
    }

    let recent = &history[history.len().saturating_sub(HISTORY_WINDOW)..];
    let frustrated = recent
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(query))
        .filter(|turn| contains_any(&normalize(turn), FRUSTRATION_MARKERS))
        .count();
    if frustrated >= FRUSTRATION_TRIGGER {
        return Some(TransferReason::Frustration);
    }

    if !query_norm.is_empty() && history.len() >= REPEAT_TRIGGER - 1 {
        let repeats = history
            .iter()
            .rev()
            .take(REPEAT_TRIGGER - 1)
            .all(|turn| normalize(turn) == query_norm);
        if repeats {
            return Some(TransferReason::RepeatedQuestion);
        }
    }

    None
}
