use std::io::Read;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(alias = "couple_name", alias = "Couple", alias = "Name")]
    name: String,
}

/// Read engaged-couple names from a CSV export with a `name`/`couple_name` column.
pub fn read_roster<R: Read>(reader: R) -> Result<Vec<String>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader
        .deserialize::<RosterRow>()
        .map(|row| row.map(|row| row.name))
        .collect()
}

pub fn read_roster_file(path: &Path) -> Result<Vec<String>, csv::Error> {
    let file = std::fs::File::open(path)?;
    read_roster(file)
}
