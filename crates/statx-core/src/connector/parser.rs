use crate::error::DecodeError;
use crate::language::LangPriority;
use crate::repository::{Codelist, DataSet, DataStructure, Dataflow};

/// Dialect strategy that decodes response bodies into repository entities,
/// one method per resource kind.
///
/// A parser declares the media types it accepts; the generic connector
/// rejects anything else before the body reaches the parser. Localized
/// texts are resolved against the caller's language preference at decode
/// time, so entities carry plain strings.
pub trait ResponseParser: Send + Sync {
    /// Media types this parser can decode, in preference order. Used both
    /// for the `Accept` header and to validate the response content type.
    fn accepted_media_types(&self) -> &[&'static str];

    fn parse_flows(
        &self,
        body: &[u8],
        languages: &LangPriority,
    ) -> Result<Vec<Dataflow>, DecodeError>;

    fn parse_flow(
        &self,
        body: &[u8],
        languages: &LangPriority,
    ) -> Result<Option<Dataflow>, DecodeError>;

    fn parse_structure(
        &self,
        body: &[u8],
        languages: &LangPriority,
    ) -> Result<Option<DataStructure>, DecodeError>;

    fn parse_data(&self, body: &[u8], languages: &LangPriority) -> Result<DataSet, DecodeError>;

    fn parse_codelist(
        &self,
        body: &[u8],
        languages: &LangPriority,
    ) -> Result<Option<Codelist>, DecodeError>;

    /// Whether a response content type is decodable by this parser.
    fn accepts(&self, media_type: &str) -> bool {
        self.accepted_media_types()
            .iter()
            .any(|accepted| crate::transport::media::matches(accepted, media_type))
    }
}
