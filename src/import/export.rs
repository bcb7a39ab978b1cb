//! CSV export of the buffer and of an empty template
//!
//! Both exports use the import column layout so an exported file can be
//! corrected offline and uploaded again unchanged.

use csv::WriterBuilder;
use std::io::Write;

use super::normalizer::{Column, Field};
use super::row::{ImportRow, PropertyDefinition, StagedRow};

pub const LINE_NUMBER_HEADER: &str = "lineNumber";
pub const ERROR_MESSAGE_HEADER: &str = "errorMessage";

/// How a row kind is laid out in an import file
pub trait CsvRecord: Sized {
    type Column: Column;

    /// Cells for [`Self::Column`], in column order
    fn core_cells(&self) -> Vec<String>;

    /// Stored value of a dynamic property
    fn property(&self, key: &str) -> Option<&str>;

    /// Row shown in the template
    fn example() -> Self;
}

impl CsvRecord for ImportRow {
    type Column = Field;

    fn core_cells(&self) -> Vec<String> {
        vec![
            // New rows get a fresh id when re-imported
            if self.is_update {
                self.id.clone()
            } else {
                String::new()
            },
            self.asset_number.clone(),
            self.catalogue_item_code.clone().unwrap_or_default(),
            self.serial_number.clone().unwrap_or_default(),
            self.installation_date.clone().unwrap_or_default(),
            self.notes.clone(),
            self.store_code.clone().unwrap_or_default(),
        ]
    }

    fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    fn example() -> Self {
        ImportRow {
            asset_number: "A unique asset number".to_string(),
            catalogue_item_code: Some("A catalogue item code".to_string()),
            serial_number: Some("SN-0001".to_string()),
            installation_date: Some("2024-01-31".to_string()),
            notes: "Optional notes".to_string(),
            store_code: Some("An optional store code".to_string()),
            ..Default::default()
        }
    }
}

fn header_row<C: Column>(properties: &[PropertyDefinition], with_errors: bool) -> Vec<String> {
    let mut headers: Vec<String> = C::ALL.iter().map(|c| c.header().to_string()).collect();
    headers.extend(properties.iter().map(|p| p.name.clone()));
    if with_errors {
        headers.push(LINE_NUMBER_HEADER.to_string());
        headers.push(ERROR_MESSAGE_HEADER.to_string());
    }
    headers
}

/// Write the buffer with each row's source line number and error message.
///
/// `properties` fixes the order of the dynamic columns.
pub fn export_with_errors<R, W>(
    rows: &[R],
    properties: &[PropertyDefinition],
    writer: W,
) -> Result<(), csv::Error>
where
    R: CsvRecord + StagedRow,
    W: Write,
{
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(header_row::<R::Column>(properties, true))?;

    for row in rows {
        let mut record = row.core_cells();
        record.extend(
            properties
                .iter()
                .map(|p| row.property(&p.key).unwrap_or_default().to_string()),
        );
        record.push(row.line_number().to_string());
        record.push(row.error_message().to_string());
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write a starting file: header plus one example row.
pub fn export_template<R, W>(properties: &[PropertyDefinition], writer: W) -> Result<(), csv::Error>
where
    R: CsvRecord,
    W: Write,
{
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(header_row::<R::Column>(properties, false))?;

    let mut record = R::example().core_cells();
    record.extend(properties.iter().map(|_| String::new()));
    wtr.write_record(&record)?;

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::normalizer::{Normalizer, ReferenceData, RowNormalizer};
    use crate::import::parser::RowParser;
    use crate::import::row::PropertyValueType;
    use crate::import::session::ImportSession;
    use std::path::Path;

    fn properties() -> Vec<PropertyDefinition> {
        vec![
            PropertyDefinition {
                key: "energy_source".into(),
                name: "Energy Source".into(),
                value_type: PropertyValueType::String,
                allowed_values: None,
            },
            PropertyDefinition {
                key: "volume".into(),
                name: "Volume".into(),
                value_type: PropertyValueType::Float,
                allowed_values: None,
            },
        ]
    }

    fn to_string(f: impl FnOnce(&mut Vec<u8>) -> Result<(), csv::Error>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_template_output() {
        let csv = to_string(|buf| export_template::<ImportRow, _>(&properties(), buf));
        insta::assert_snapshot!(csv, @r"
        id,assetNumber,catalogueItemCode,serialNumber,installationDate,notes,storeCode,Energy Source,Volume
        ,A unique asset number,A catalogue item code,SN-0001,2024-01-31,Optional notes,An optional store code,,
        ");
    }

    #[test]
    fn test_export_writes_source_line_numbers() {
        let rows: Vec<ImportRow> = [(0, 4), (1, 9), (2, 10)]
            .into_iter()
            .map(|(i, line)| ImportRow {
                id: format!("AST-{i}"),
                line_number: line,
                asset_number: format!("A-{i}"),
                error_message: if i == 1 {
                    "boom, twice".into()
                } else {
                    String::new()
                },
                ..Default::default()
            })
            .collect();

        let csv = to_string(|buf| export_with_errors(&rows, &[], buf));
        let mut rdr = csv::Reader::from_reader(csv.as_bytes());
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(&headers[7], LINE_NUMBER_HEADER);
        assert_eq!(&headers[8], ERROR_MESSAGE_HEADER);

        let records: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
        let lines: Vec<&str> = records.iter().map(|r| &r[7]).collect();
        assert_eq!(lines, vec!["4", "9", "10"]);
        assert_eq!(&records[1][8], "boom, twice");
    }

    #[test]
    fn test_set_aside_rows_keep_their_source_lines() {
        let input = "id,assetNumber,catalogueItemCode\n\
                     ,A-1,FR-100\n\
                     ,A-2,FR-100\n\
                     ,,FR-100\n\
                     ,A-4,FR-100\n\
                     ,A-5,NOPE\n";
        let reference = ReferenceData::new(["FR-100"]);
        let chunks = RowParser::new(1024)
            .from_reader(input.as_bytes(), Path::new("assets.csv"))
            .unwrap();
        let rows = Normalizer::new(&reference, &[]).normalize_chunks(chunks).unwrap();

        let mut session = ImportSession::new();
        session.load(rows).unwrap();
        let summary_lines: Vec<String> = session
            .validation_summary()
            .iter()
            .map(|(line, _)| line.to_string())
            .collect();
        assert_eq!(summary_lines, vec!["4", "6"]);

        let set_aside = session.take_invalid().unwrap();
        let csv = to_string(|buf| export_with_errors(&set_aside, &[], buf));
        let exported: Vec<String> = csv::Reader::from_reader(csv.as_bytes())
            .records()
            .map(|r| r.unwrap()[7].to_string())
            .collect();

        assert_eq!(exported, summary_lines);
        assert_eq!(session.rows().len(), 3);
    }

    #[test]
    fn test_id_only_written_for_updates() {
        let rows = vec![
            ImportRow {
                id: "AST-new".into(),
                is_update: false,
                ..Default::default()
            },
            ImportRow {
                id: "existing-7".into(),
                is_update: true,
                ..Default::default()
            },
        ];
        let csv = to_string(|buf| export_with_errors(&rows, &[], buf));
        let records: Vec<csv::StringRecord> = csv::Reader::from_reader(csv.as_bytes())
            .records()
            .map(Result::unwrap)
            .collect();
        assert_eq!(&records[0][0], "");
        assert_eq!(&records[1][0], "existing-7");
    }

    #[test]
    fn test_property_columns_in_caller_order() {
        let mut row = ImportRow {
            line_number: 2,
            ..Default::default()
        };
        row.properties.insert("volume".into(), "120".into());
        row.properties.insert("energy_source".into(), "Solar".into());

        let mut reversed = properties();
        reversed.reverse();
        let csv = to_string(|buf| export_with_errors(&[row], &reversed, buf));
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().contains("storeCode,Volume,Energy Source,lineNumber"));
        assert!(lines.next().unwrap().contains(",120,Solar,2,"));
    }

    #[test]
    fn test_exported_failures_reimport_with_same_fields() {
        let reference = ReferenceData::new(["FR-100"]).with_stores(["ST-1"]);
        let props = properties();
        let original = ImportRow {
            id: "existing-1".into(),
            is_update: true,
            asset_number: "A-1".into(),
            catalogue_item_code: Some("FR-100".into()),
            serial_number: Some("SN-1".into()),
            installation_date: Some("2023-05-01".into()),
            notes: "left, of door".into(),
            store_code: Some("ST-1".into()),
            properties: [("energy_source".to_string(), "Solar".to_string())]
                .into_iter()
                .collect(),
            error_message: "AssetNumberAlreadyExists".into(),
            ..Default::default()
        };

        let csv =
            to_string(|buf| export_with_errors(std::slice::from_ref(&original), &props, buf));
        let chunks = RowParser::new(1024)
            .from_reader(csv.as_bytes(), Path::new("failed.csv"))
            .unwrap();
        let rows = Normalizer::new(&reference, &props).normalize_chunks(chunks).unwrap();

        let reimported = &rows[0];
        assert_eq!(reimported.id, original.id);
        assert!(reimported.is_update);
        assert_eq!(reimported.asset_number, original.asset_number);
        assert_eq!(reimported.serial_number, original.serial_number);
        assert_eq!(reimported.installation_date, original.installation_date);
        assert_eq!(reimported.notes, original.notes);
        assert_eq!(reimported.store_code, original.store_code);
        assert_eq!(reimported.properties, original.properties);
        assert_eq!(reimported.line_number, 2);
        assert!(!reimported.has_error());
    }
}
