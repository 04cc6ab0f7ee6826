#[derive(Debug)]
pub enum CliError {
    Io {
        source: String,
        path: Option<String>,
    },
    ParseError {
        msg: String,
    },
    Config {
        source: String,
    },
    Engine {
        source: String,
    },
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<mzfeature::MzFeatureError> for CliError {
    fn from(x: mzfeature::MzFeatureError) -> Self {
        match x {
            mzfeature::MzFeatureError::Config(e) => Self::Config {
                source: e.to_string(),
            },
            other => Self::Engine {
                source: other.to_string(),
            },
        }
    }
}
