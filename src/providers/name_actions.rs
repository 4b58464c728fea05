//! Decodes the name actions carried by the covenants of a block.

use thiserror::Error;

use crate::models::{
    block::{RawBlock, TxOutput},
    name_action::{ActionDetails, NameAction, NameActionKind},
};

/// Errors raised while decoding a single covenant.
#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
    /// The covenant's action string does not match its type.
    #[error("Covenant type {covenant_type} expects action {expected}, found {found:?}")]
    ActionMismatch {
        /// Numeric covenant type.
        covenant_type: u8,
        /// Action implied by the type.
        expected: NameActionKind,
        /// Action string found on the covenant.
        found: String,
    },

    /// A covenant item required by the action is absent.
    #[error("{action} covenant is missing item {index}")]
    MissingItem {
        /// Action being decoded.
        action: NameActionKind,
        /// Index of the missing item.
        index: usize,
    },

    /// A name item is not valid hex.
    #[error("Invalid hex in name item: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// A name item does not decode to UTF-8.
    #[error("Name item is not valid UTF-8")]
    InvalidUtf8,
}

type Decoder = fn(&TxOutput, &[String]) -> Result<NameAction, DecodeError>;

/// Decoders indexed by covenant type. Type 0 (`NONE`) carries no action.
const DECODERS: [Option<(NameActionKind, Decoder)>; 12] = [
    None,
    Some((NameActionKind::Claim, decode_claim as Decoder)),
    Some((NameActionKind::Open, decode_open as Decoder)),
    Some((NameActionKind::Bid, decode_bid as Decoder)),
    Some((NameActionKind::Reveal, decode_reveal as Decoder)),
    Some((NameActionKind::Redeem, decode_redeem as Decoder)),
    Some((NameActionKind::Register, decode_register as Decoder)),
    Some((NameActionKind::Update, decode_update as Decoder)),
    Some((NameActionKind::Renew, decode_renew as Decoder)),
    Some((NameActionKind::Transfer, decode_transfer as Decoder)),
    Some((NameActionKind::Finalize, decode_finalize as Decoder)),
    Some((NameActionKind::Revoke, decode_revoke as Decoder)),
];

const NAME_HASH_ITEM: usize = 0;
const NAME_ITEM: usize = 2;

fn item(kind: NameActionKind, items: &[String], index: usize) -> Result<&str, DecodeError> {
    items.get(index).map(String::as_str).ok_or(DecodeError::MissingItem { action: kind, index })
}

fn name_item(kind: NameActionKind, items: &[String]) -> Result<String, DecodeError> {
    let bytes = hex::decode(item(kind, items, NAME_ITEM)?)?;
    String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
}

fn hash_only(
    kind: NameActionKind,
    items: &[String],
    details: ActionDetails,
) -> Result<NameAction, DecodeError> {
    Ok(NameAction::new(item(kind, items, NAME_HASH_ITEM)?, None, details))
}

fn named(
    kind: NameActionKind,
    items: &[String],
    details: ActionDetails,
) -> Result<NameAction, DecodeError> {
    let name_hash = item(kind, items, NAME_HASH_ITEM)?;
    let name = name_item(kind, items)?;
    Ok(NameAction::new(name_hash, Some(name), details))
}

fn decode_claim(vout: &TxOutput, items: &[String]) -> Result<NameAction, DecodeError> {
    named(NameActionKind::Claim, items, ActionDetails::Claim { reserved_amount: vout.value })
}

fn decode_open(_: &TxOutput, items: &[String]) -> Result<NameAction, DecodeError> {
    named(NameActionKind::Open, items, ActionDetails::Open)
}

fn decode_bid(vout: &TxOutput, items: &[String]) -> Result<NameAction, DecodeError> {
    named(NameActionKind::Bid, items, ActionDetails::Bid { lockup_amount: vout.value })
}

fn decode_reveal(vout: &TxOutput, items: &[String]) -> Result<NameAction, DecodeError> {
    hash_only(NameActionKind::Reveal, items, ActionDetails::Reveal { bid_amount: vout.value })
}

fn decode_redeem(_: &TxOutput, items: &[String]) -> Result<NameAction, DecodeError> {
    hash_only(NameActionKind::Redeem, items, ActionDetails::Redeem)
}

fn decode_register(vout: &TxOutput, items: &[String]) -> Result<NameAction, DecodeError> {
    hash_only(NameActionKind::Register, items, ActionDetails::Register { burned_value: vout.value })
}

fn decode_update(_: &TxOutput, items: &[String]) -> Result<NameAction, DecodeError> {
    hash_only(NameActionKind::Update, items, ActionDetails::Update)
}

fn decode_renew(_: &TxOutput, items: &[String]) -> Result<NameAction, DecodeError> {
    hash_only(NameActionKind::Renew, items, ActionDetails::Renew)
}

fn decode_transfer(_: &TxOutput, items: &[String]) -> Result<NameAction, DecodeError> {
    hash_only(NameActionKind::Transfer, items, ActionDetails::Transfer)
}

fn decode_finalize(_: &TxOutput, items: &[String]) -> Result<NameAction, DecodeError> {
    named(NameActionKind::Finalize, items, ActionDetails::Finalize)
}

fn decode_revoke(_: &TxOutput, items: &[String]) -> Result<NameAction, DecodeError> {
    hash_only(NameActionKind::Revoke, items, ActionDetails::Revoke)
}

/// Decodes the name action of a single output.
///
/// Returns `Ok(None)` for outputs without a covenant, `NONE` covenants and
/// covenant types this crate does not know.
pub fn name_action_from_output(vout: &TxOutput) -> Result<Option<NameAction>, DecodeError> {
    let Some(covenant) = &vout.covenant else {
        return Ok(None);
    };
    let Some(Some((kind, decode))) = DECODERS.get(usize::from(covenant.covenant_type)) else {
        return Ok(None);
    };

    if covenant.action != kind.as_str() {
        return Err(DecodeError::ActionMismatch {
            covenant_type: covenant.covenant_type,
            expected: *kind,
            found: covenant.action.clone(),
        });
    }

    decode(vout, &covenant.items).map(Some)
}

/// Decodes every name action in the block, in transaction and output order.
///
/// An output that fails to decode is logged and skipped.
pub fn name_actions_from_block(block: &RawBlock) -> Vec<NameAction> {
    let mut actions = Vec::new();
    for tx in &block.tx {
        for (index, vout) in tx.vout.iter().enumerate() {
            match name_action_from_output(vout) {
                Ok(Some(action)) => actions.push(action),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        block_height = block.height,
                        txid = %tx.txid,
                        output = index,
                        "Skipping undecodable covenant."
                    );
                }
            }
        }
    }
    tracing::debug!(block_height = block.height, count = actions.len(), "Decoded name actions.");
    actions
}
