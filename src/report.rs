use std::fmt::Write;

use crate::dashboard::{ClassDashboard, SubjectSummary};
use crate::models::TermScope;
use crate::risk::{RiskLevel, RiskScore};

fn write_subjects(output: &mut String, subjects: &[SubjectSummary]) {
    if subjects.is_empty() {
        let _ = writeln!(output, "No subject results recorded for this term.");
        return;
    }
    for subject in subjects {
        let _ = writeln!(
            output,
            "- {}: average {:.1}%, pass rate {:.1}% ({} students)",
            subject.subject, subject.average, subject.pass_rate, subject.student_count
        );
    }
}

/// Renders a markdown class report from a dashboard and the class's risk
/// ranking (highest risk first).
pub fn build_report(
    class_name: &str,
    scope: &TermScope,
    dashboard: &ClassDashboard,
    risks: &[RiskScore],
    limit: usize,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Class Performance Report: {class_name}");
    let _ = writeln!(
        output,
        "Session {} / term {} ({} students)",
        scope.session_id, scope.term_id, dashboard.total_students
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Class average: {:.1}%", dashboard.class_average);
    let _ = writeln!(output, "- Pass rate: {:.1}%", dashboard.pass_rate);
    let tiers = &dashboard.tier_distribution;
    let _ = writeln!(
        output,
        "- Tiers: {} excellent, {} good, {} average, {} at risk",
        tiers.excellent, tiers.good, tiers.average, tiers.at_risk
    );

    if !dashboard.term_trend.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Term Trend");
        for point in &dashboard.term_trend {
            let _ = writeln!(
                output,
                "- {} ({}): average {:.1}%, pass rate {:.1}%",
                point.term, point.timestamp, point.average, point.pass_rate
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Strongest Subjects");
    write_subjects(&mut output, &dashboard.top_subjects);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weakest Subjects");
    write_subjects(&mut output, &dashboard.worst_subjects);

    let flagged: Vec<&RiskScore> = risks
        .iter()
        .filter(|r| r.risk_level >= RiskLevel::Medium)
        .take(limit)
        .collect();

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students Needing Attention");

    if flagged.is_empty() {
        let _ = writeln!(output, "No students above low risk this term.");
    } else {
        for risk in flagged {
            let _ = writeln!(
                output,
                "- {} ({}): risk {} ({}), average {:.1}%",
                risk.student_name,
                risk.student_id,
                risk.risk_score,
                risk.risk_level.as_str(),
                risk.current_average
            );
            for recommendation in &risk.recommendations {
                let _ = writeln!(output, "  - {recommendation}");
            }
        }
    }

    output
}
