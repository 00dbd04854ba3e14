//! The two distributed applications the dataplane can carry. They share the
//! wire protocol and differ only in topic names, corpus and result payload.

use std::fmt;
use std::str::FromStr;

use crate::utils::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Application {
    #[default]
    ImageClassification,
    TextTranslation,
}

impl Application {
    /// Topic carrying work frames, endpoint → worker.
    pub fn work_topic(self) -> &'static str {
        match self {
            Application::ImageClassification => "image-classification-sub",
            Application::TextTranslation => "text-translation-sub",
        }
    }

    /// Topic carrying acks, worker → endpoint.
    pub fn ack_topic(self) -> &'static str {
        match self {
            Application::ImageClassification => "image-classification-pub",
            Application::TextTranslation => "text-translation-pub",
        }
    }

    /// Noun used in the finish records.
    pub fn noun(self) -> &'static str {
        match self {
            Application::ImageClassification => "images",
            Application::TextTranslation => "texts",
        }
    }

    pub fn corpus_extension(self) -> &'static str {
        match self {
            Application::ImageClassification => "JPEG",
            Application::TextTranslation => "txt",
        }
    }

    pub fn default_corpus_dir(self) -> &'static str {
        self.noun()
    }

    /// Whether acks carry the result text in front of the timestamp.
    pub fn acks_carry_result(self) -> bool {
        matches!(self, Application::TextTranslation)
    }
}

impl FromStr for Application {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "image_classification" => Ok(Application::ImageClassification),
            "text_translation" => Ok(Application::TextTranslation),
            other => Err(Error::Config(format!("unknown application '{other}'"))),
        }
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Application::ImageClassification => f.write_str("image_classification"),
            Application::TextTranslation => f.write_str("text_translation"),
        }
    }
}

#[cfg(test)]
mod tests;
