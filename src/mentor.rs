//! Mentor tips: fixed educational content connecting the other agents'
//! output. The client cycles through the list; ordering is part of the
//! contract.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelatedAgent {
    Report,
    News,
    Trading,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorTip {
    pub id: u32,
    pub title: String,
    pub content: String,
    pub related_agent: RelatedAgent,
}

pub fn mock_mentor_tips() -> Vec<MentorTip> {
    vec![
        MentorTip {
            id: 1,
            title: "Understanding Reports".to_string(),
            content: "The AI-generated report provides a great starting point. Pay close \
                      attention to the 'Key Risks' section to build a balanced view."
                .to_string(),
            related_agent: RelatedAgent::Report,
        },
        MentorTip {
            id: 2,
            title: "Market Sentiment".to_string(),
            content: "The news feed shows market sentiment. A string of 'Negative' articles \
                      might indicate a broader market downturn, even for a strong stock."
                .to_string(),
            related_agent: RelatedAgent::News,
        },
        MentorTip {
            id: 3,
            title: "Signal Confirmation".to_string(),
            content: "The ML agent's signals are based on historical patterns. Use them as a \
                      guide, but look for confirmation from other sources, like news or your \
                      own analysis."
                .to_string(),
            related_agent: RelatedAgent::Trading,
        },
        MentorTip {
            id: 4,
            title: "Long-Term vs. Short-Term".to_string(),
            content: "The DL agent's forecast is a short-term trend prediction. Contrast this \
                      with the fundamental analysis in the AI report for a long-term \
                      perspective."
                .to_string(),
            related_agent: RelatedAgent::Trading,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tips_keep_stable_ids_and_camel_case_contract() {
        let tips = mock_mentor_tips();
        assert_eq!(tips.len(), 4);
        let ids: Vec<u32> = tips.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);

        let v = serde_json::to_value(&tips[0]).unwrap();
        assert_eq!(v["relatedAgent"], serde_json::json!("Report"));
        assert!(v["title"].is_string());
    }
}
