use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use solana_address_lookup_table_interface::state::AddressLookupTable;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    message::{v0, AddressLookupTableAccount, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::VersionedTransaction,
};
use tracing::{debug, info};

use crate::{
    decompile::fetch_lookup_tables,
    wallet::{Connection, SendTransactionRequest, SentTransaction, WalletClient},
};

#[derive(Clone)]
pub struct RpcConnection {
    rpc: Arc<RpcClient>,
}

impl RpcConnection {
    pub fn new(rpc_url: String) -> Self {
        Self::from_client(Arc::new(RpcClient::new(rpc_url)))
    }

    pub fn from_client(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }

    pub fn client(&self) -> &RpcClient {
        &self.rpc
    }
}

#[async_trait]
impl Connection for RpcConnection {
    async fn get_address_lookup_table(
        &self,
        address: &Pubkey,
    ) -> anyhow::Result<Option<AddressLookupTableAccount>> {
        let Some(account) = self
            .rpc
            .get_account_with_commitment(address, self.rpc.commitment())
            .await?
            .value
        else {
            return Ok(None);
        };

        let table = AddressLookupTable::deserialize(&account.data)
            .map_err(|e| anyhow!("account {} is not an address lookup table: {}", address, e))?;
        debug!(%address, addresses = table.addresses.len(), "loaded address lookup table");

        Ok(Some(AddressLookupTableAccount {
            key: *address,
            addresses: table.addresses.to_vec(),
        }))
    }
}

pub struct KeypairWallet {
    keypair: Keypair,
    connection: RpcConnection,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair, connection: RpcConnection) -> Self {
        Self {
            keypair,
            connection,
        }
    }
}

#[async_trait]
impl WalletClient for KeypairWallet {
    fn get_address(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    fn get_connection(&self) -> &dyn Connection {
        &self.connection
    }

    async fn send_transaction(
        &self,
        request: SendTransactionRequest,
    ) -> anyhow::Result<SentTransaction> {
        let lookup_tables =
            fetch_lookup_tables(&self.connection, &request.address_lookup_table_addresses).await?;
        let blockhash = self.connection.client().get_latest_blockhash().await?;

        let message = v0::Message::try_compile(
            &self.keypair.pubkey(),
            &request.instructions,
            &lookup_tables,
            blockhash,
        )?;
        let transaction =
            VersionedTransaction::try_new(VersionedMessage::V0(message), &[&self.keypair])?;

        let signature = self
            .connection
            .client()
            .send_transaction(&transaction)
            .await?;
        info!(%signature, "transaction submitted");

        Ok(SentTransaction {
            hash: signature.to_string(),
        })
    }
}
