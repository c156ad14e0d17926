//! Pièces jointes MIME et encodage des content-id.
//!
//! Le nom de part WSDL d'une pièce jointe est encodé dans son content-id
//! sous la forme `<part-percent-encodé>=<uuid>@<domaine>` (WSI-AP 1.0,
//! §3.8). Le décodage est tolérant : un content-id qui ne respecte pas
//! cette forme donne simplement un nom de part absent, jamais une erreur.

use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use uuid::Uuid;

/// Pièce jointe d'un message
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Content-Id MIME, chevrons éventuels compris
    pub content_id: String,

    /// Type MIME déclaré
    pub content_type: String,

    /// Octets bruts de la part
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(
        content_id: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            content_id: content_id.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Nom de part WSDL extrait du content-id.
    ///
    /// `None` si le content-id n'est pas de la forme `part=uuid@domaine`
    /// ou si le percent-décodage échoue.
    pub fn part_name(&self) -> Option<String> {
        let cid = self.content_id.as_str();

        let at = cid.rfind('@')?;
        let local = &cid[..at];
        let eq = local.rfind('=')?;
        let encoded = local[..eq].trim_start_matches('<');

        percent_decode_str(encoded)
            .decode_utf8()
            .ok()
            .map(|s| s.into_owned())
    }
}

/// Encode un content-id pour une pièce jointe sortante.
///
/// Forme produite : `<part=uuid@domaine>`, le nom de part étant
/// percent-encodé comme l'exige WSI-AP.
pub fn encode_content_id(part_name: &str, domain: &str) -> String {
    format!(
        "<{}={}@{}>",
        utf8_percent_encode(part_name, NON_ALPHANUMERIC),
        Uuid::new_v4(),
        domain
    )
}
