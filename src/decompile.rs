use futures::future::join_all;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    message::{AddressLookupTableAccount, VersionedMessage},
    pubkey::Pubkey,
    transaction::VersionedTransaction,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{wallet::Connection, ClientError};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LookupTablePolicy {
    #[default]
    Lenient,
    Strict,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecompileError {
    #[error("Address lookup table {0} not found")]
    MissingLookupTable(Pubkey),
    #[error("Index {index} out of range for lookup table {table} with {len} addresses")]
    LookupIndexOutOfRange {
        table: Pubkey,
        index: u8,
        len: usize,
    },
    #[error("Account index {index} out of range for {len} account keys")]
    AccountIndexOutOfRange { index: u8, len: usize },
}

/// Lookup table keys referenced by `message`, in message order.
pub fn lookup_table_addresses(message: &VersionedMessage) -> Vec<Pubkey> {
    message
        .address_table_lookups()
        .unwrap_or_default()
        .iter()
        .map(|lookup| lookup.account_key)
        .collect()
}

pub async fn decompile_versioned_transaction(
    connection: &dyn Connection,
    transaction: &VersionedTransaction,
    policy: LookupTablePolicy,
) -> Result<Vec<Instruction>, ClientError> {
    let addresses = lookup_table_addresses(&transaction.message);
    let tables = fetch_lookup_tables(connection, &addresses).await?;
    Ok(decompile_message(&transaction.message, &tables, policy)?)
}

/// Tables that do not exist are dropped.
pub async fn fetch_lookup_tables(
    connection: &dyn Connection,
    addresses: &[Pubkey],
) -> Result<Vec<AddressLookupTableAccount>, ClientError> {
    if addresses.is_empty() {
        return Ok(Vec::new());
    }
    debug!(count = addresses.len(), "fetching address lookup tables");

    let results = join_all(
        addresses
            .iter()
            .map(|address| connection.get_address_lookup_table(address)),
    )
    .await;

    let mut tables = Vec::with_capacity(results.len());
    for (address, result) in addresses.iter().zip(results) {
        match result.map_err(ClientError::Connection)? {
            Some(table) => tables.push(table),
            None => debug!(%address, "address lookup table not found"),
        }
    }
    Ok(tables)
}

pub fn decompile_message(
    message: &VersionedMessage,
    tables: &[AddressLookupTableAccount],
    policy: LookupTablePolicy,
) -> Result<Vec<Instruction>, DecompileError> {
    let mut loaded_writable = Vec::new();
    let mut loaded_readonly = Vec::new();

    for lookup in message.address_table_lookups().unwrap_or_default() {
        let Some(table) = tables.iter().find(|t| t.key == lookup.account_key) else {
            match policy {
                LookupTablePolicy::Strict => {
                    return Err(DecompileError::MissingLookupTable(lookup.account_key))
                }
                LookupTablePolicy::Lenient => {
                    warn!(
                        table = %lookup.account_key,
                        "lookup table unresolved, skipping its accounts"
                    );
                    continue;
                }
            }
        };
        loaded_writable.extend(resolve_indexes(table, &lookup.writable_indexes)?);
        loaded_readonly.extend(resolve_indexes(table, &lookup.readonly_indexes)?);
    }

    let static_keys = message.static_account_keys();
    let header = message.header();
    let roles = AccountRoles {
        num_static: static_keys.len(),
        num_signed: header.num_required_signatures as usize,
        num_readonly_signed: header.num_readonly_signed_accounts as usize,
        num_readonly_unsigned: header.num_readonly_unsigned_accounts as usize,
        num_loaded_writable: loaded_writable.len(),
    };
    let account_keys: Vec<Pubkey> = static_keys
        .iter()
        .chain(&loaded_writable)
        .chain(&loaded_readonly)
        .copied()
        .collect();

    let key_at = |index: u8| {
        account_keys
            .get(index as usize)
            .copied()
            .ok_or(DecompileError::AccountIndexOutOfRange {
                index,
                len: account_keys.len(),
            })
    };

    message
        .instructions()
        .iter()
        .map(|compiled| {
            let accounts = compiled
                .accounts
                .iter()
                .map(|&index| {
                    Ok(AccountMeta {
                        pubkey: key_at(index)?,
                        is_signer: roles.is_signer(index as usize),
                        is_writable: roles.is_writable(index as usize),
                    })
                })
                .collect::<Result<Vec<_>, DecompileError>>()?;

            Ok(Instruction {
                program_id: key_at(compiled.program_id_index)?,
                accounts,
                data: compiled.data.clone(),
            })
        })
        .collect()
}

fn resolve_indexes(
    table: &AddressLookupTableAccount,
    indexes: &[u8],
) -> Result<Vec<Pubkey>, DecompileError> {
    indexes
        .iter()
        .map(|&index| {
            table
                .addresses
                .get(index as usize)
                .copied()
                .ok_or(DecompileError::LookupIndexOutOfRange {
                    table: table.key,
                    index,
                    len: table.addresses.len(),
                })
        })
        .collect()
}

struct AccountRoles {
    num_static: usize,
    num_signed: usize,
    num_readonly_signed: usize,
    num_readonly_unsigned: usize,
    num_loaded_writable: usize,
}

impl AccountRoles {
    fn is_signer(&self, index: usize) -> bool {
        index < self.num_signed
    }

    fn is_writable(&self, index: usize) -> bool {
        if index < self.num_signed {
            index < self.num_signed.saturating_sub(self.num_readonly_signed)
        } else if index < self.num_static {
            index < self.num_static.saturating_sub(self.num_readonly_unsigned)
        } else {
            index - self.num_static < self.num_loaded_writable
        }
    }
}
