use serde::{Deserialize, Serialize};

use crate::store::{CandidateQuestion, PackContext};

pub const DEFAULT_PACK_ICON: &str = "layers";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackInfo {
    pub name: String,
    pub icon: String,
}

/// Pack badge for a card: the scoped pack's context when browsing a single
/// pack, otherwise whatever pack data came joined onto the question.
pub fn build_pack_info(
    scoped_pack_id: Option<&str>,
    pack_context: Option<&PackContext>,
    question: &CandidateQuestion,
) -> Option<PackInfo> {
    if scoped_pack_id.is_some() {
        if let Some(context) = pack_context {
            return Some(PackInfo {
                name: context.name.clone(),
                icon: context.icon.clone(),
            });
        }
    }

    question.pack_name.as_ref().map(|name| PackInfo {
        name: name.clone(),
        icon: question
            .pack_icon
            .clone()
            .unwrap_or_else(|| DEFAULT_PACK_ICON.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(pack_name: Option<&str>, pack_icon: Option<&str>) -> CandidateQuestion {
        serde_json::from_value(serde_json::json!({
            "id": "q1",
            "text": "Weekend away?",
            "pack_name": pack_name,
            "pack_icon": pack_icon,
        }))
        .unwrap()
    }

    #[test]
    fn scoped_pack_context_wins() {
        let context = PackContext { name: "Adventure".to_string(), icon: "compass".to_string() };
        let info = build_pack_info(Some("p1"), Some(&context), &question(Some("Other"), None)).unwrap();
        assert_eq!(info.name, "Adventure");
        assert_eq!(info.icon, "compass");
    }

    #[test]
    fn joined_pack_defaults_icon() {
        let info = build_pack_info(None, None, &question(Some("Romance"), None)).unwrap();
        assert_eq!(info, PackInfo { name: "Romance".to_string(), icon: "layers".to_string() });
        assert!(build_pack_info(None, None, &question(None, None)).is_none());
    }
}
