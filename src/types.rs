use crate::error::RecordError;
use ethers::types::{Address, Bytes, H256, Transaction, TransactionReceipt, U64, U256};
use ethers::utils::hex;
use serde::{Deserialize, Serialize};

/// One observed transaction and its receipt, flattened for storage.
///
/// Every field keeps the textual on-chain representation so that hashes and
/// 256-bit integers survive the trip to the database without loss. Records
/// are immutable: they are built whole, either from a transaction/receipt
/// pair or through [`TransactionRecordBuilder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    block_hash: String,
    block_number: String,
    hash: String,
    transaction_index: String,
    nonce: String,
    from: String,
    to: String,
    value: String,
    gas: String,
    gas_price: String,
    input: String,
    trace: String,
    contract_address: String,
    cumulative_gas_used: String,
    gas_used: String,
    status: String,
    fail_reason: String,
}

impl TransactionRecord {
    /// Starts building a record field by field
    pub fn builder() -> TransactionRecordBuilder {
        TransactionRecordBuilder::default()
    }

    /// Flatten a transaction and its execution receipt into a record
    ///
    /// # Rendering
    /// - Hashes, addresses and calldata: `0x`-prefixed lowercase hex
    /// - Integers: decimal strings
    /// - Status: `"1"` on success, `"0"` on failure, empty before Byzantium
    /// - Absent values (`to` on contract creation, pending block fields,
    ///   no contract created): empty string
    ///
    /// Block identity falls back to the receipt when the transaction body was
    /// fetched before inclusion. The gas price falls back to the receipt's
    /// effective gas price for typed transactions that omit it.
    pub fn from_parts(
        tx: &Transaction,
        receipt: &TransactionReceipt,
        trace: Option<String>,
        fail_reason: Option<String>,
    ) -> Self {
        let block_hash = tx.block_hash.or(receipt.block_hash);
        let block_number = tx.block_number.or(receipt.block_number);
        let transaction_index = tx.transaction_index.unwrap_or(receipt.transaction_index);
        let gas_price = tx.gas_price.or(receipt.effective_gas_price);

        Self {
            block_hash: block_hash.as_ref().map(hex_hash).unwrap_or_default(),
            block_number: opt_u64(block_number),
            hash: hex_hash(&tx.hash),
            transaction_index: transaction_index.to_string(),
            nonce: tx.nonce.to_string(),
            from: hex_address(&tx.from),
            to: tx.to.as_ref().map(hex_address).unwrap_or_default(),
            value: tx.value.to_string(),
            gas: tx.gas.to_string(),
            gas_price: opt_u256(gas_price),
            input: hex_bytes(&tx.input),
            trace: trace.unwrap_or_default(),
            contract_address: receipt
                .contract_address
                .as_ref()
                .map(hex_address)
                .unwrap_or_default(),
            cumulative_gas_used: receipt.cumulative_gas_used.to_string(),
            gas_used: opt_u256(receipt.gas_used),
            status: opt_u64(receipt.status),
            fail_reason: fail_reason.unwrap_or_default(),
        }
    }

    pub fn block_hash(&self) -> &str {
        &self.block_hash
    }

    pub fn block_number(&self) -> &str {
        &self.block_number
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn transaction_index(&self) -> &str {
        &self.transaction_index
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Gas limit requested by the sender
    pub fn gas(&self) -> &str {
        &self.gas
    }

    pub fn gas_price(&self) -> &str {
        &self.gas_price
    }

    /// Calldata
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Execution trace, empty when none was captured
    pub fn trace(&self) -> &str {
        &self.trace
    }

    pub fn contract_address(&self) -> &str {
        &self.contract_address
    }

    pub fn cumulative_gas_used(&self) -> &str {
        &self.cumulative_gas_used
    }

    pub fn gas_used(&self) -> &str {
        &self.gas_used
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn fail_reason(&self) -> &str {
        &self.fail_reason
    }
}

fn hex_hash(hash: &H256) -> String {
    format!("0x{}", hex::encode(hash.as_bytes()))
}

fn hex_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

fn hex_bytes(bytes: &Bytes) -> String {
    format!("0x{}", hex::encode(bytes.as_ref()))
}

fn opt_u64(value: Option<U64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn opt_u256(value: Option<U256>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

macro_rules! builder_setters {
    ($($field:ident),* $(,)?) => {
        $(
            pub fn $field(mut self, $field: impl Into<String>) -> Self {
                self.$field = Some($field.into());
                self
            }
        )*
    };
}

/// Builder for [`TransactionRecord`]
///
/// `trace`, `contract_address` and `fail_reason` default to empty. Every other
/// field must be set, otherwise [`build`](Self::build) fails and no record is
/// produced.
#[derive(Debug, Default, Clone)]
pub struct TransactionRecordBuilder {
    block_hash: Option<String>,
    block_number: Option<String>,
    hash: Option<String>,
    transaction_index: Option<String>,
    nonce: Option<String>,
    from: Option<String>,
    to: Option<String>,
    value: Option<String>,
    gas: Option<String>,
    gas_price: Option<String>,
    input: Option<String>,
    trace: Option<String>,
    contract_address: Option<String>,
    cumulative_gas_used: Option<String>,
    gas_used: Option<String>,
    status: Option<String>,
    fail_reason: Option<String>,
}

impl TransactionRecordBuilder {
    builder_setters!(
        block_hash,
        block_number,
        hash,
        transaction_index,
        nonce,
        from,
        to,
        value,
        gas,
        gas_price,
        input,
        trace,
        contract_address,
        cumulative_gas_used,
        gas_used,
        status,
        fail_reason,
    );

    pub fn build(self) -> Result<TransactionRecord, RecordError> {
        fn required(value: Option<String>, name: &'static str) -> Result<String, RecordError> {
            value.ok_or(RecordError::MissingField(name))
        }

        Ok(TransactionRecord {
            block_hash: required(self.block_hash, "block_hash")?,
            block_number: required(self.block_number, "block_number")?,
            hash: required(self.hash, "hash")?,
            transaction_index: required(self.transaction_index, "transaction_index")?,
            nonce: required(self.nonce, "nonce")?,
            from: required(self.from, "from")?,
            to: required(self.to, "to")?,
            value: required(self.value, "value")?,
            gas: required(self.gas, "gas")?,
            gas_price: required(self.gas_price, "gas_price")?,
            input: required(self.input, "input")?,
            trace: self.trace.unwrap_or_default(),
            contract_address: self.contract_address.unwrap_or_default(),
            cumulative_gas_used: required(self.cumulative_gas_used, "cumulative_gas_used")?,
            gas_used: required(self.gas_used, "gas_used")?,
            status: required(self.status, "status")?,
            fail_reason: self.fail_reason.unwrap_or_default(),
        })
    }
}

/// Summary of one orchestrator run, returned when the record channel closes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub records_received: u64,
    pub batches_written: u64,
    pub records_written: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx() -> Transaction {
        Transaction {
            hash: H256::repeat_byte(0xab),
            nonce: U256::from(7),
            block_hash: Some(H256::repeat_byte(0x11)),
            block_number: Some(U64::from(17_000_000u64)),
            transaction_index: Some(U64::from(3)),
            from: Address::repeat_byte(0x01),
            to: Some(Address::repeat_byte(0x02)),
            value: U256::from_dec_str("1000000000000000000000").unwrap(),
            gas_price: Some(U256::from(30_000_000_000u64)),
            gas: U256::from(21_000),
            input: Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]),
            ..Default::default()
        }
    }

    fn sample_receipt() -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: H256::repeat_byte(0xab),
            transaction_index: U64::from(3),
            cumulative_gas_used: U256::from(63_000),
            gas_used: Some(U256::from(21_000)),
            status: Some(U64::from(1)),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_parts_renders_on_chain_text() {
        let record = TransactionRecord::from_parts(&sample_tx(), &sample_receipt(), None, None);

        assert_eq!(record.hash(), format!("0x{}", "ab".repeat(32)));
        assert_eq!(record.block_hash(), format!("0x{}", "11".repeat(32)));
        assert_eq!(record.block_number(), "17000000");
        assert_eq!(record.transaction_index(), "3");
        assert_eq!(record.nonce(), "7");
        assert_eq!(record.from(), format!("0x{}", "01".repeat(20)));
        assert_eq!(record.to(), format!("0x{}", "02".repeat(20)));
        assert_eq!(record.value(), "1000000000000000000000");
        assert_eq!(record.gas(), "21000");
        assert_eq!(record.gas_price(), "30000000000");
        assert_eq!(record.input(), "0xdeadbeef");
        assert_eq!(record.cumulative_gas_used(), "63000");
        assert_eq!(record.gas_used(), "21000");
        assert_eq!(record.status(), "1");
        assert_eq!(record.trace(), "");
        assert_eq!(record.contract_address(), "");
        assert_eq!(record.fail_reason(), "");
    }

    #[test]
    fn test_from_parts_contract_creation_and_failure() {
        let mut tx = sample_tx();
        tx.to = None;
        tx.block_hash = None;
        tx.block_number = None;

        let mut receipt = sample_receipt();
        receipt.contract_address = Some(Address::repeat_byte(0xcc));
        receipt.status = Some(U64::zero());
        receipt.block_hash = Some(H256::repeat_byte(0x22));
        receipt.block_number = Some(U64::from(5));

        let record = TransactionRecord::from_parts(
            &tx,
            &receipt,
            Some("CALL 0x02".to_string()),
            Some("out of gas".to_string()),
        );

        assert_eq!(record.to(), "");
        assert_eq!(record.contract_address(), format!("0x{}", "cc".repeat(20)));
        assert_eq!(record.status(), "0");
        assert_eq!(record.fail_reason(), "out of gas");
        assert_eq!(record.trace(), "CALL 0x02");
        // Block identity comes from the receipt when the body was pending
        assert_eq!(record.block_hash(), format!("0x{}", "22".repeat(32)));
        assert_eq!(record.block_number(), "5");
    }

    #[test]
    fn test_from_parts_falls_back_to_effective_gas_price() {
        let mut tx = sample_tx();
        tx.gas_price = None;
        let mut receipt = sample_receipt();
        receipt.effective_gas_price = Some(U256::from(42));

        let record = TransactionRecord::from_parts(&tx, &receipt, None, None);
        assert_eq!(record.gas_price(), "42");
    }

    #[test]
    fn test_builder_requires_every_mandatory_field() {
        let err = TransactionRecord::builder()
            .block_hash("0x01")
            .block_number("1")
            .build()
            .unwrap_err();

        assert!(matches!(err, RecordError::MissingField("hash")));
    }

    #[test]
    fn test_builder_defaults_optional_fields_to_empty() {
        let record = TransactionRecord::builder()
            .block_hash("0x01")
            .block_number("1")
            .hash("0xaa")
            .transaction_index("0")
            .nonce("0")
            .from("0x10")
            .to("0x20")
            .value("0")
            .gas("21000")
            .gas_price("1")
            .input("0x")
            .cumulative_gas_used("21000")
            .gas_used("21000")
            .status("1")
            .build()
            .unwrap();

        assert_eq!(record.hash(), "0xaa");
        assert_eq!(record.trace(), "");
        assert_eq!(record.contract_address(), "");
        assert_eq!(record.fail_reason(), "");
    }
}
