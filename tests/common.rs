use std::path::Path;

use csv::ReaderBuilder;
use easprov::{
    FromElement, FromElements, Pipeline,
    document::read,
    wbxml::{Codebook, decode},
};

#[test]
fn read_text_fixture() {
    const PATH: &str = "fixtures/mix2.xml";
    let text = std::fs::read_to_string(PATH).unwrap();
    let mut validator = Validator::new(PATH);
    read(&text, "Provision", &mut validator).unwrap();
    validator.finish();
}

#[test]
fn read_decoded_fixture() {
    const PATH: &str = "fixtures/mix2.wbxml";
    let data = std::fs::read(PATH).unwrap();
    let text = decode(&data, &Codebook::default()).unwrap();
    let mut validator = Validator::new(PATH);
    read(&text, "Provision", &mut validator).unwrap();
    validator.finish();
}

#[test]
fn read_decoded_string_table_fixture() {
    const PATH: &str = "fixtures/mix2-string-table.wbxml";
    let data = std::fs::read(PATH).unwrap();
    let text = decode(&data, &Codebook::default()).unwrap();
    let mut validator = Validator::new("fixtures/mix2.csv");
    validator.skip_policy();
    read(&text, "Provision", &mut validator).unwrap();
    validator.finish();
}

#[test]
fn decode_matches_text_fixture() {
    let data = std::fs::read("fixtures/mix2.wbxml").unwrap();
    let expected = std::fs::read_to_string("fixtures/mix2.xml").unwrap();
    assert_eq!(decode(&data, &Codebook::default()).unwrap(), expected);
}

#[test]
fn extract_fixture_records() {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path("fixtures/records.csv")
        .unwrap();

    let pipeline = Pipeline::default();

    for row in reader.records() {
        let row = row.unwrap();
        let data = std::fs::read(Path::new("fixtures").join(&row[0])).unwrap();

        let record = pipeline.extract(&data).unwrap();
        let expected: Vec<&str> = row.iter().skip(1).collect();
        assert_eq!(record.fields().as_slice(), expected.as_slice(), "{}", &row[0]);
    }
}

/// Checks published blocks and text against a list of expected events.
struct Validator {
    expected: Vec<Vec<String>>,
    paths: Vec<&'static str>,
}

impl Validator {
    fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().with_extension("csv");

        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_path(path)
            .unwrap();

        let expected: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(|f| f.to_string()).collect())
            .collect();

        Self {
            expected,
            paths: vec!["DeviceInformation/Set", "Policies/Policy"],
        }
    }

    /// Expect no policy block.
    fn skip_policy(&mut self) {
        let start = self
            .expected
            .iter()
            .position(|e| e[0] == "Policies/Policy")
            .unwrap();
        self.expected.truncate(start);
    }

    fn finish(self) {
        assert!(self.expected.is_empty(), "missing {:?}", self.expected);
    }
}

impl FromElements for Validator {
    fn add_block(&mut self, path: &str) -> Option<&mut dyn FromElement> {
        if !self.paths.iter().any(|p| *p == path) {
            return None;
        }

        assert_eq!(self.expected.remove(0), [path]);
        Some(self)
    }

    fn block(&mut self, path: &str) -> Option<&mut dyn FromElement> {
        assert!(self.paths.iter().any(|p| *p == path));
        Some(self)
    }
}

impl FromElement for Validator {
    fn add_text(&mut self, name: &str, text: &str) {
        assert_eq!(self.expected.remove(0), [name, text]);
    }
}
