use crate::document::{Alignment, Document};
use crate::errors::ReportError;
use crate::estimate::{MonthlyProduction, MONTHS_IN_YEAR};
use crate::formatting::{FieldValue, NumberFormat};
use crate::input::Parameters;
use crate::Recommendation;
use anyhow::Context;
use indexmap::IndexMap;
use std::fmt::Debug;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

/// Index of the monthly production table among the template's tables.
pub const MONTHLY_TABLE_INDEX: usize = 1;
const SOLAR_RADIATION_COLUMN: usize = 1;
const AC_ENERGY_COLUMN: usize = 2;
const TOTALS_ROW: usize = MONTHS_IN_YEAR + 1;

/// Where recommendation templates are loaded from, by file name.
pub trait TemplateSource: Debug {
    fn load_template(&self, name: &str) -> anyhow::Result<String>;
}

#[derive(Debug)]
pub struct DirectoryTemplates {
    directory_path: PathBuf,
}

impl DirectoryTemplates {
    pub fn new(directory_path: PathBuf) -> Self {
        Self { directory_path }
    }
}

impl TemplateSource for DirectoryTemplates {
    fn load_template(&self, name: &str) -> anyhow::Result<String> {
        let path = self.directory_path.join(name);
        fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
    }
}

pub(crate) fn load_document(
    templates: &impl TemplateSource,
    name: &str,
) -> Result<Document, ReportError> {
    let text = templates
        .load_template(name)
        .map_err(|source| ReportError::TemplateUnavailable {
            name: name.to_string(),
            source,
        })?;

    Ok(Document::parse(&text)?)
}

/// All values offered to template placeholders: the source parameters followed by the derived
/// metrics, with derived values replacing any source value of the same code.
pub fn placeholder_fields(
    parameters: &Parameters,
    recommendation: &Recommendation,
    current_month: &str,
) -> IndexMap<String, FieldValue> {
    let mut fields: IndexMap<String, FieldValue> = parameters
        .source_fields
        .iter()
        .map(|(code, value)| (code.clone(), FieldValue::from(value)))
        .collect();
    // identifiers render exactly as sent to the service and used in the file name
    fields.insert("AR".to_string(), FieldValue::Text(parameters.report_id.clone()));
    fields.insert("ZIP".to_string(), FieldValue::Text(parameters.zip.clone()));

    let sizing = &recommendation.sizing;
    let financials = &recommendation.financials;
    fields.extend(
        [
            ("AMV", FieldValue::Decimal(recommendation.incentive_rate)),
            ("AS", FieldValue::Integer(sizing.available_space)),
            ("CAP", FieldValue::Integer(sizing.capacity)),
            ("AES", FieldValue::Integer(sizing.approximate_energy_savings)),
            ("ES", FieldValue::Integer(recommendation.annual_energy)),
            ("ACSel", FieldValue::Integer(financials.electric_savings)),
            ("credits", FieldValue::Integer(financials.credits)),
            ("ACSsu", FieldValue::Integer(financials.incentive_savings)),
            ("ACS", FieldValue::Integer(financials.total_savings)),
            ("IC", FieldValue::Integer(financials.implementation_cost)),
            ("ITC", FieldValue::Integer(financials.tax_credit)),
            ("MIC", FieldValue::Integer(financials.net_cost)),
            ("PB", FieldValue::Decimal(financials.payback)),
            ("CM", FieldValue::Text(current_month.to_string())),
        ]
        .map(|(code, value)| (code.to_string(), value)),
    );

    fields
}

/// Fills rows 1 to 12 of the monthly table and writes the average/total row beneath them.
pub fn fill_monthly_table(
    document: &mut Document,
    monthly: Option<&MonthlyProduction>,
    format: &NumberFormat,
) -> Result<(), ReportError> {
    let monthly = monthly.ok_or(ReportError::MonthlySeriesUnavailable)?;
    let table = document.table_mut(MONTHLY_TABLE_INDEX)?;
    table.ensure_size(TOTALS_ROW + 1, AC_ENERGY_COLUMN + 1)?;

    for (month, (solar_radiation, ac_energy)) in monthly
        .solar_radiation
        .iter()
        .zip(monthly.ac_energy.iter())
        .enumerate()
    {
        let row = month + 1;
        table.set_text(row, SOLAR_RADIATION_COLUMN, format.grouped(*solar_radiation, 2))?;
        table.set_text(
            row,
            AC_ENERGY_COLUMN,
            format.grouped_integer(ac_energy.round_ties_even() as i64),
        )?;
    }

    table
        .set_text(
            TOTALS_ROW,
            SOLAR_RADIATION_COLUMN,
            format.grouped(monthly.average_solar_radiation(), 2),
        )?
        .bold = true;
    table
        .set_text(
            TOTALS_ROW,
            AC_ENERGY_COLUMN,
            format.grouped_integer(monthly.total_ac_energy().round_ties_even() as i64),
        )?
        .bold = true;

    table.set_alignment(SOLAR_RADIATION_COLUMN, Alignment::Right)?;
    table.set_alignment(AC_ENERGY_COLUMN, Alignment::Right)?;

    Ok(())
}

/// Logs any placeholders the parameter set had no value for.
pub(crate) fn warn_unresolved(document: &Document, template_name: &str) {
    let unresolved = document.unresolved_placeholders();
    if !unresolved.is_empty() {
        warn!(
            "template {template_name} has placeholders with no value: {}",
            unresolved.join(", ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DocumentError;
    use pretty_assertions::assert_eq;
    use rstest::*;

    const MONTHS: [&str; MONTHS_IN_YEAR] = [
        "January", "February", "March", "April", "May", "June", "July", "August", "September",
        "October", "November", "December",
    ];

    fn monthly_template() -> String {
        let mut template = String::from(
            "Summary for ${AR}\n\n| Metric | Value |\n|---|---|\n| Capacity | ${CAP} kW |\n\n\
             | Month | Solar Radiation (kWh/m2/day) | AC Energy (kWh) |\n|---|---|---|\n",
        );
        for month in MONTHS {
            template.push_str(&format!("| {month} | | |\n"));
        }
        template.push_str("| **Average/Total** | | |\n");

        template
    }

    #[fixture]
    fn monthly() -> MonthlyProduction {
        MonthlyProduction {
            solar_radiation: [
                2.614, 3.42, 4.37, 5.21, 5.64, 6.02, 6.01, 5.58, 4.91, 3.86, 2.69, 2.236,
            ],
            ac_energy: [
                7012.4, 8302.1, 11205.7, 12710.3, 13650.9, 13822.5, 14015.2, 13380.8, 11920.6,
                10010.1, 7220.3, 6120.9,
            ],
        }
    }

    #[rstest]
    fn should_fill_monthly_rows_and_totals(monthly: MonthlyProduction) {
        let mut document = Document::parse(&monthly_template()).unwrap();

        fill_monthly_table(&mut document, Some(&monthly), &NumberFormat::en_us()).unwrap();

        let table = document.tables().nth(MONTHLY_TABLE_INDEX).unwrap();
        assert_eq!(table.cell(1, 1).unwrap().text, "2.61");
        assert_eq!(table.cell(1, 2).unwrap().text, "7,012");
        assert_eq!(table.cell(12, 1).unwrap().text, "2.24");
        assert_eq!(table.cell(12, 2).unwrap().text, "6,121");
        assert!(!table.cell(12, 2).unwrap().bold);
        assert_eq!(table.alignment(1), Some(Alignment::Right));
        assert_eq!(table.alignment(2), Some(Alignment::Right));
    }

    #[rstest]
    fn should_write_average_and_total_in_bold(monthly: MonthlyProduction) {
        let mut document = Document::parse(&monthly_template()).unwrap();

        fill_monthly_table(&mut document, Some(&monthly), &NumberFormat::en_us()).unwrap();

        let table = document.tables().nth(MONTHLY_TABLE_INDEX).unwrap();
        let average = monthly.solar_radiation.iter().sum::<f64>() / 12.;
        assert_eq!(table.cell(13, 1).unwrap().text, format!("{average:.2}"));
        assert_eq!(table.cell(13, 1).unwrap().text, "4.38");
        assert_eq!(table.cell(13, 2).unwrap().text, "129,372");
        assert!(table.cell(13, 1).unwrap().bold);
        assert!(table.cell(13, 2).unwrap().bold);
        assert!(document
            .render()
            .contains("| **Average/Total** | **4.38** | **129,372** |"));
    }

    #[rstest]
    fn should_fail_clearly_without_monthly_series() {
        let mut document = Document::parse(&monthly_template()).unwrap();

        assert!(matches!(
            fill_monthly_table(&mut document, None, &NumberFormat::en_us()),
            Err(ReportError::MonthlySeriesUnavailable)
        ));
    }

    #[rstest]
    fn should_fail_when_template_table_is_too_small(monthly: MonthlyProduction) {
        let mut document = Document::parse(
            "| a | b |\n|---|---|\n\n| Month | Solar | AC |\n|---|---|---|\n| Jan | | |\n",
        )
        .unwrap();

        assert!(matches!(
            fill_monthly_table(&mut document, Some(&monthly), &NumberFormat::en_us()),
            Err(ReportError::Document(DocumentError::TableTooSmall { actual_rows: 2, .. }))
        ));
    }

    #[rstest]
    fn should_fail_when_template_has_no_monthly_table(monthly: MonthlyProduction) {
        let mut document = Document::parse("no tables here\n").unwrap();

        assert!(matches!(
            fill_monthly_table(&mut document, Some(&monthly), &NumberFormat::en_us()),
            Err(ReportError::Document(DocumentError::NoSuchTable(1)))
        ));
    }

    #[rstest]
    fn should_report_unavailable_template() {
        let templates = DirectoryTemplates::new(PathBuf::from("/nonexistent/templates"));

        assert!(matches!(
            load_document(&templates, "missing.md"),
            Err(ReportError::TemplateUnavailable { name, .. }) if name == "missing.md"
        ));
    }
}
