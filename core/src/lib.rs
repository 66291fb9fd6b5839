//! Find SQL hiding in source code.
//!
//! Extractors walk host-language sources and turn every string-producing
//! expression into a [`CandidateString`](candidate::CandidateString) whose
//! runtime parts are `$NN` placeholders. The [`Validator`](validator::Validator)
//! then decides, with an Earley parse over an ANSI SQL grammar, whether the
//! candidate is a SQL statement.
//!
//! ```
//! use sqlsift_core::prelude::*;
//!
//! let file = SourceFile::new(
//!     "app.py",
//!     Language::Python,
//!     "cur.execute('SELECT * FROM users WHERE id = ' + uid)\n",
//! );
//! let extractor = extractor_for(Language::Python, ExtractOptions::default());
//! let validator = Validator::new(ValidatorConfig::default()).unwrap();
//! let report = analyze_file(&file, extractor.as_ref(), &validator, &CancelToken::new());
//! assert_eq!(report.accepted().count(), 1);
//! ```

pub mod candidate;
pub mod error;
pub mod extractor;
pub mod pipeline;
pub mod placeholder;
pub mod validator;

pub mod prelude {
    pub use crate::candidate::{CandidateString, OriginKind, SourceLocation};
    pub use crate::error::{SiftError, SiftResult};
    pub use crate::extractor::{
        ExtractOptions, Extractor, Language, SourceFile, extractor_for,
    };
    pub use crate::pipeline::{AnalysisRecord, CancelToken, FileFailure, FileReport, analyze_file};
    pub use crate::validator::{
        FailureReason, StatementKind, StatementPolicy, Validator, ValidatorConfig, Verdict,
    };
}
