//! Result rendering shared by every front-end.
//!
//! [`render`] turns a [`ResearchResult`] into a [`Report`]: one block per
//! company plus an optional trailing analysis block. Front-ends only decide
//! how to paint the blocks; which lines appear, in what order, and how lists
//! are truncated is decided here and nowhere else.

use std::fmt;

use crate::model::{CompanyRecord, ResearchResult};

/// Maximum tech-stack entries shown per company.
pub const TECH_STACK_LIMIT: usize = 5;
/// Maximum supported languages shown per company.
pub const LANGUAGE_SUPPORT_LIMIT: usize = 5;
/// Maximum integrations shown per company.
pub const INTEGRATIONS_LIMIT: usize = 4;
/// Description the workflow emits when it could not analyse a company.
pub const ANALYSIS_FAILED_SENTINEL: &str = "Analysis failed";
/// Width of the rule printed above the analysis block.
pub const ANALYSIS_RULE_WIDTH: usize = 40;
/// Width of the rule printed under the results heading.
pub const HEADING_RULE_WIDTH: usize = 60;
/// Title of the analysis block.
pub const ANALYSIS_TITLE: &str = "Developer Recommendations:";

const UNKNOWN: &str = "Unknown";

/// A labelled line within a company block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportField {
    Website,
    Pricing,
    OpenSource,
    TechStack,
    LanguageSupport,
    Api,
    Integrations,
    Description,
}

impl ReportField {
    pub fn label(self) -> &'static str {
        match self {
            Self::Website => "Website",
            Self::Pricing => "Pricing",
            Self::OpenSource => "Open Source",
            Self::TechStack => "Tech Stack",
            Self::LanguageSupport => "Language Support",
            Self::Api => "API",
            Self::Integrations => "Integrations",
            Self::Description => "Description",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::Website => "🌐",
            Self::Pricing => "💰",
            Self::OpenSource => "📖",
            Self::TechStack => "🛠️ ",
            Self::LanguageSupport => "💻",
            Self::Api => "🔌",
            Self::Integrations => "🔗",
            Self::Description => "📝",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub field: ReportField,
    pub value: String,
}

/// Everything shown for one company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyBlock {
    /// 1-based position in the result.
    pub index: usize,
    pub name: String,
    pub lines: Vec<ReportLine>,
}

impl CompanyBlock {
    /// Value of `field`, if the block shows it.
    pub fn value(&self, field: ReportField) -> Option<&str> {
        self.lines
            .iter()
            .find(|l| l.field == field)
            .map(|l| l.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportBlock {
    Company(CompanyBlock),
    Analysis(String),
}

/// A rendered result, ready for any front-end to display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub blocks: Vec<ReportBlock>,
}

impl Report {
    pub fn companies(&self) -> impl Iterator<Item = &CompanyBlock> {
        self.blocks.iter().filter_map(|b| match b {
            ReportBlock::Company(c) => Some(c),
            ReportBlock::Analysis(_) => None,
        })
    }

    pub fn analysis(&self) -> Option<&str> {
        self.blocks.iter().find_map(|b| match b {
            ReportBlock::Analysis(text) => Some(text.as_str()),
            ReportBlock::Company(_) => None,
        })
    }
}

/// Render a result. Pure and deterministic.
pub fn render(result: &ResearchResult) -> Report {
    let mut blocks: Vec<ReportBlock> = result
        .companies
        .iter()
        .enumerate()
        .map(|(i, company)| ReportBlock::Company(render_company(i + 1, company)))
        .collect();

    if let Some(analysis) = result.analysis.as_deref().filter(|a| !a.is_empty()) {
        blocks.push(ReportBlock::Analysis(analysis.to_owned()));
    }

    Report { blocks }
}

fn render_company(index: usize, company: &CompanyRecord) -> CompanyBlock {
    let mut lines = vec![
        line(ReportField::Website, company.website.clone()),
        line(
            ReportField::Pricing,
            company
                .pricing_model
                .clone()
                .unwrap_or_else(|| UNKNOWN.to_string()),
        ),
        line(
            ReportField::OpenSource,
            match company.is_open_source {
                Some(true) => "Yes",
                Some(false) => "No",
                None => UNKNOWN,
            }
            .to_string(),
        ),
    ];

    if !company.tech_stack.is_empty() {
        lines.push(line(
            ReportField::TechStack,
            join_limited(&company.tech_stack, TECH_STACK_LIMIT),
        ));
    }
    if !company.language_support.is_empty() {
        lines.push(line(
            ReportField::LanguageSupport,
            join_limited(&company.language_support, LANGUAGE_SUPPORT_LIMIT),
        ));
    }
    if let Some(available) = company.api_available {
        let status = if available { "Available" } else { "Not Available" };
        lines.push(line(ReportField::Api, status.to_string()));
    }
    if !company.integration_capabilities.is_empty() {
        lines.push(line(
            ReportField::Integrations,
            join_limited(&company.integration_capabilities, INTEGRATIONS_LIMIT),
        ));
    }
    if let Some(description) = company
        .description
        .as_deref()
        .filter(|d| !d.is_empty() && *d != ANALYSIS_FAILED_SENTINEL)
    {
        lines.push(line(ReportField::Description, description.to_owned()));
    }

    CompanyBlock {
        index,
        name: company.name.clone(),
        lines,
    }
}

fn line(field: ReportField, value: String) -> ReportLine {
    ReportLine { field, value }
}

fn join_limited(items: &[String], limit: usize) -> String {
    items
        .iter()
        .take(limit)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Heading printed above a report, e.g. `📊 Results for: vector databases`.
pub fn results_heading(query: &str) -> String {
    format!("📊 Results for: {query}")
}

/// Plain-text layout used by the console.
impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            match block {
                ReportBlock::Company(company) => {
                    writeln!(f)?;
                    writeln!(f, "{}. 🏢 {}", company.index, company.name)?;
                    for l in &company.lines {
                        writeln!(f, "   {} {}: {}", l.field.icon(), l.field.label(), l.value)?;
                    }
                    writeln!(f)?;
                }
                ReportBlock::Analysis(text) => {
                    writeln!(f, "{ANALYSIS_TITLE}")?;
                    writeln!(f, "{}", "-".repeat(ANALYSIS_RULE_WIDTH))?;
                    writeln!(f, "{text}")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn acme() -> CompanyRecord {
        CompanyRecord {
            name: "Acme".to_string(),
            website: "acme.io".to_string(),
            pricing_model: Some("freemium".to_string()),
            is_open_source: Some(false),
            tech_stack: strings(&["Rust", "Go", "Python", "C++", "Java", "Kotlin"]),
            api_available: Some(true),
            ..CompanyRecord::default()
        }
    }

    fn single(company: CompanyRecord) -> CompanyBlock {
        let report = render(&ResearchResult {
            companies: vec![company],
            analysis: None,
        });
        report.companies().next().cloned().unwrap()
    }

    #[test]
    fn acme_scenario() {
        let report = render(&ResearchResult {
            companies: vec![acme()],
            analysis: None,
        });

        assert_eq!(report.blocks.len(), 1, "no trailing analysis block");
        let block = report.companies().next().unwrap();
        assert_eq!(block.index, 1);
        assert_eq!(block.name, "Acme");
        assert_eq!(block.value(ReportField::Website), Some("acme.io"));
        assert_eq!(block.value(ReportField::Pricing), Some("freemium"));
        assert_eq!(block.value(ReportField::OpenSource), Some("No"));
        assert_eq!(
            block.value(ReportField::TechStack),
            Some("Rust, Go, Python, C++, Java")
        );
        assert_eq!(block.value(ReportField::Api), Some("Available"));
        assert_eq!(block.value(ReportField::Description), None);
        assert_eq!(block.value(ReportField::LanguageSupport), None);
        assert_eq!(block.value(ReportField::Integrations), None);
    }

    #[test]
    fn always_shown_fields_come_first_in_order() {
        let block = single(CompanyRecord::new("Bare", "bare.dev"));
        let fields: Vec<_> = block.lines.iter().map(|l| l.field).collect();
        assert_eq!(
            fields,
            vec![
                ReportField::Website,
                ReportField::Pricing,
                ReportField::OpenSource
            ]
        );
        assert_eq!(block.value(ReportField::Pricing), Some("Unknown"));
        assert_eq!(block.value(ReportField::OpenSource), Some("Unknown"));
    }

    #[test]
    fn list_truncation_limits() {
        let many: Vec<String> = (0..12).map(|i| format!("item{i}")).collect();
        let block = single(CompanyRecord {
            tech_stack: many.clone(),
            language_support: many.clone(),
            integration_capabilities: many,
            ..CompanyRecord::new("Big", "big.io")
        });

        let count = |field| block.value(field).unwrap().split(", ").count();
        assert_eq!(count(ReportField::TechStack), TECH_STACK_LIMIT);
        assert_eq!(count(ReportField::LanguageSupport), LANGUAGE_SUPPORT_LIMIT);
        assert_eq!(count(ReportField::Integrations), INTEGRATIONS_LIMIT);
    }

    #[test]
    fn short_lists_are_shown_whole() {
        let block = single(CompanyRecord {
            integration_capabilities: strings(&["GitHub", "Slack"]),
            ..CompanyRecord::new("Small", "small.io")
        });
        assert_eq!(block.value(ReportField::Integrations), Some("GitHub, Slack"));
    }

    #[test]
    fn api_unavailable_label() {
        let block = single(CompanyRecord {
            api_available: Some(false),
            ..CompanyRecord::new("Closed", "closed.io")
        });
        assert_eq!(block.value(ReportField::Api), Some("Not Available"));
    }

    #[test]
    fn description_suppression() {
        for hidden in [None, Some(""), Some(ANALYSIS_FAILED_SENTINEL)] {
            let block = single(CompanyRecord {
                description: hidden.map(str::to_string),
                ..CompanyRecord::new("X", "x.io")
            });
            assert_eq!(
                block.value(ReportField::Description),
                None,
                "description {hidden:?} should be hidden"
            );
        }

        let block = single(CompanyRecord {
            description: Some("A hosted vector store".to_string()),
            ..CompanyRecord::new("X", "x.io")
        });
        assert_eq!(
            block.value(ReportField::Description),
            Some("A hosted vector store")
        );
    }

    #[test]
    fn analysis_block_only_when_non_empty() {
        for analysis in [None, Some(String::new())] {
            let report = render(&ResearchResult {
                companies: vec![],
                analysis,
            });
            assert!(report.blocks.is_empty());
        }

        let report = render(&ResearchResult {
            companies: vec![acme()],
            analysis: Some("Pick Acme.".to_string()),
        });
        assert_eq!(report.blocks.len(), 2);
        assert_eq!(
            report.blocks.last(),
            Some(&ReportBlock::Analysis("Pick Acme.".to_string()))
        );
        assert_eq!(report.analysis(), Some("Pick Acme."));
    }

    #[test]
    fn companies_are_numbered_from_one() {
        let report = render(&ResearchResult {
            companies: vec![CompanyRecord::new("A", "a"), CompanyRecord::new("B", "b")],
            analysis: None,
        });
        let indexes: Vec<_> = report.companies().map(|c| c.index).collect();
        assert_eq!(indexes, vec![1, 2]);
    }

    #[test]
    fn rendering_is_deterministic() {
        let result = ResearchResult {
            companies: vec![acme(), CompanyRecord::new("B", "b.io")],
            analysis: Some("Both fine.".to_string()),
        };
        assert_eq!(render(&result), render(&result));
        assert_eq!(render(&result).to_string(), render(&result).to_string());
    }

    #[test]
    fn plain_text_layout() {
        let report = render(&ResearchResult {
            companies: vec![acme()],
            analysis: Some("Pick Acme.".to_string()),
        });
        let text = report.to_string();

        assert!(text.contains("1. 🏢 Acme\n"));
        assert!(text.contains("   🌐 Website: acme.io\n"));
        assert!(text.contains("   🔌 API: Available\n"));
        assert!(!text.contains("Kotlin"));
        let rule = "-".repeat(ANALYSIS_RULE_WIDTH);
        assert!(text.ends_with(&format!("{ANALYSIS_TITLE}\n{rule}\nPick Acme.\n")));
    }

    #[test]
    fn heading_names_the_query() {
        assert_eq!(
            results_heading("vector databases"),
            "📊 Results for: vector databases"
        );
    }
}
