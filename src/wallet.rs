use async_trait::async_trait;
use solana_sdk::{
    instruction::Instruction, message::AddressLookupTableAccount, pubkey::Pubkey,
};

#[async_trait]
pub trait Connection: Send + Sync {
    /// Returns `None` when no lookup table lives at `address`.
    async fn get_address_lookup_table(
        &self,
        address: &Pubkey,
    ) -> anyhow::Result<Option<AddressLookupTableAccount>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendTransactionRequest {
    pub instructions: Vec<Instruction>,
    pub address_lookup_table_addresses: Vec<Pubkey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTransaction {
    pub hash: String,
}

#[async_trait]
pub trait WalletClient: Send + Sync {
    fn get_address(&self) -> Pubkey;

    fn get_connection(&self) -> &dyn Connection;

    async fn send_transaction(
        &self,
        request: SendTransactionRequest,
    ) -> anyhow::Result<SentTransaction>;
}
