use clap::Parser;

/// This is a reporting program for the attendance of the Connect encounters.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file. It may provide the path of the workbook, the names of the
    /// sheets, the photo directory, the date range and the output path. Relative paths are resolved against the
    /// directory of the configuration file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference report in JSON format. If provided, connectdash will check that the computed report
    /// matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the report will be written in JSON format to the given
    /// location. Setting this option overrides the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) The Excel workbook (.xlsx) with the participants, the attendance and the encounters.
    /// Setting this option overrides the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (date, may be repeated) The first and the last date of the range to report on, both included
    /// (for example --dates 2024-01-01 --dates 2024-03-31). Anything else than two dates reports on all the data.
    #[clap(long, value_parser)]
    pub dates: Option<Vec<String>>,

    /// (directory, default assets/fotos_encontros) The directory with the photos of the encounters,
    /// named after their date: DD-MM-YYYY.jpeg
    #[clap(long, value_parser)]
    pub assets: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
