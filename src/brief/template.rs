//! Prompt construction and the offline fallback texts

use super::{BriefRequest, NetworkOverview};

/// HIGH at 0.7 and above, MEDIUM from 0.4, LOW otherwise
pub fn risk_level(risk_score: f64) -> &'static str {
    if risk_score >= 0.7 {
        "HIGH"
    } else if risk_score >= 0.4 {
        "MEDIUM"
    } else {
        "LOW"
    }
}

fn join_or(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.join(", ")
    }
}

pub fn suspect_prompt(req: &BriefRequest) -> String {
    let mut prompt = format!(
        "You are an intelligence analyst preparing a briefing for law enforcement.
Generate a concise, professional intelligence briefing for the following suspect:

SUSPECT PROFILE:
- Name: {}
- Risk Score: {:.2}%
- Risk Level: {}
- Network Ring: {}
- Known Connections: {}
",
        req.name,
        req.risk_score * 100.0,
        risk_level(req.risk_score),
        req.ring_label,
        join_or(&req.connections, "None identified"),
    );

    if !req.context.is_empty() {
        prompt.push_str("\nADDITIONAL CONTEXT:\n");
        for (key, value) in &req.context {
            prompt.push_str(&format!("- {}: {}\n", key, value));
        }
    }

    prompt.push_str(
        "
Please provide:
1. A 2-3 sentence executive summary
2. 3-5 key intelligence findings
3. 2-3 recommended actions for investigators

Format as a professional intelligence brief. Be specific but avoid speculation beyond the data provided.
",
    );
    prompt
}

pub fn fallback_brief(req: &BriefRequest) -> String {
    let level = risk_level(req.risk_score);
    let pct = req.risk_score * 100.0;
    let n = req.connections.len();
    format!(
        "INTELLIGENCE BRIEFING
=====================

SUBJECT: {name}
RISK ASSESSMENT: {level} ({pct:.1}%)
NETWORK AFFILIATION: {ring}

EXECUTIVE SUMMARY:
Subject {name} has been identified with a {lower} risk score of {pct:.1}%.
Analysis indicates association with {ring}. Network analysis has identified {n} direct connections.

KEY FINDINGS:
1. Subject demonstrates {lower} risk indicators based on network analysis
2. Connected to {n} other entities in the network
3. Associated with {ring} based on community detection algorithms

KNOWN CONNECTIONS:
{connections}

RECOMMENDATIONS:
1. Continue monitoring subject's network activity
2. Investigate connections for additional intelligence
3. Cross-reference with existing case files

---
Note: This is an automated briefing. AI-enhanced analysis unavailable.
",
        name = req.name,
        level = level,
        lower = level.to_lowercase(),
        pct = pct,
        ring = req.ring_label,
        n = n,
        connections = join_or(&req.connections, "No direct connections identified"),
    )
}

pub fn network_prompt(overview: &NetworkOverview) -> String {
    let top: Vec<String> = overview.kingpins.iter().take(5).cloned().collect();
    let sizes: Vec<String> = overview.ring_sizes.iter().map(|s| s.to_string()).collect();
    format!(
        "You are an intelligence analyst. Generate a brief executive summary of a criminal network analysis.

NETWORK ANALYSIS RESULTS:
- Top Kingpins: {}
- Number of Rings/Groups: {}
- Ring Sizes: [{}]
- High Risk Individuals: {}

Provide a 3-4 sentence executive summary suitable for law enforcement leadership.
",
        join_or(&top, "None identified"),
        overview.ring_sizes.len(),
        sizes.join(", "),
        overview.high_risk_count,
    )
}

pub fn fallback_network_summary(overview: &NetworkOverview) -> String {
    let largest = overview.ring_sizes.iter().max().copied().unwrap_or(0);
    format!(
        "NETWORK ANALYSIS SUMMARY
========================
Analysis identified {} potential key players in the network, with {} distinct groups detected.
{} individuals flagged as high-risk based on their network position and activity patterns.
The largest group contains {} members.
Recommend prioritizing investigation of identified kingpins and high-risk individuals.",
        overview.kingpins.len(),
        overview.ring_sizes.len(),
        overview.high_risk_count,
        largest,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> BriefRequest {
        BriefRequest {
            name: "John Doe".to_string(),
            risk_score: 0.8567,
            ring_label: "Ring-2".to_string(),
            connections: vec!["S002".to_string(), "S003".to_string()],
            context: Vec::new(),
        }
    }

    #[test]
    fn test_risk_levels() {
        assert_eq!(risk_level(0.7), "HIGH");
        assert_eq!(risk_level(0.4), "MEDIUM");
        assert_eq!(risk_level(0.39), "LOW");
    }

    #[test]
    fn test_prompt_contents() {
        let mut req = request();
        req.context.push(("Degree".to_string(), "2".to_string()));
        let prompt = suspect_prompt(&req);
        assert!(prompt.contains("- Risk Score: 85.67%"));
        assert!(prompt.contains("- Risk Level: HIGH"));
        assert!(prompt.contains("- Known Connections: S002, S003"));
        assert!(prompt.contains("ADDITIONAL CONTEXT:\n- Degree: 2\n"));
    }

    #[test]
    fn test_context_lines_in_order() {
        let mut req = request();
        req.context.push(("Actor ID".to_string(), "S001".to_string()));
        req.context.push(("Degree".to_string(), "4".to_string()));
        let prompt = suspect_prompt(&req);
        assert!(prompt.contains("ADDITIONAL CONTEXT:\n- Actor ID: S001\n- Degree: 4\n"));
        assert!(!suspect_prompt(&request()).contains("ADDITIONAL CONTEXT"));
    }

    #[test]
    fn test_fallback_brief() {
        let brief = fallback_brief(&request());
        assert!(brief.contains("RISK ASSESSMENT: HIGH (85.7%)"));
        assert!(brief.contains("identified 2 direct connections"));
        assert!(brief.contains("NETWORK AFFILIATION: Ring-2"));

        let mut lonely = request();
        lonely.connections.clear();
        assert!(fallback_brief(&lonely).contains("No direct connections identified"));
    }

    #[test]
    fn test_fallback_network_summary() {
        let overview = NetworkOverview {
            kingpins: vec!["S001".to_string()],
            ring_sizes: vec![3, 5],
            high_risk_count: 2,
        };
        let text = fallback_network_summary(&overview);
        assert!(text.contains("identified 1 potential key players"));
        assert!(text.contains("with 2 distinct groups"));
        assert!(text.contains("largest group contains 5 members"));

        let empty = NetworkOverview::default();
        assert!(fallback_network_summary(&empty).contains("contains 0 members"));
    }
}
