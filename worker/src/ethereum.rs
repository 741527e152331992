use crate::error::Error;
use bytes::{BufMut, BytesMut};
use ethnum::U256;
use regex::Regex;
use tai_vrf::{
    helper::keccak256,
    secp256k1::{sign, Message, SecretKey},
};

/// Ethereum address
pub type Address = [u8; 20];

/// Parse a `0x` prefixed, 40 hex digits address
pub fn parse_address(value: &str) -> Result<Address, Error> {
    let regex_address = Regex::new(r#"^0x[a-fA-F0-9]{40}$"#)
        .map_err(|e| Error::Config(format!("unable to init regex: {}", e)))?;
    let trimmed = value.trim();
    if !regex_address.is_match(trimmed) {
        return Err(Error::Config(format!("invalid address: {}", value)));
    }
    let mut address = [0u8; 20];
    hex::decode_to_slice(&trimmed[2..], &mut address)
        .map_err(|_| Error::Config(format!("invalid address: {}", value)))?;
    Ok(address)
}

/// Lower case, `0x` prefixed address
pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// Big endian bytes of a number without leading zeros
fn trim_leading_zeros(value: &[u8]) -> &[u8] {
    let first = value.iter().position(|b| *b != 0).unwrap_or(value.len());
    &value[first..]
}

fn rlp_length_prefix(buf: &mut BytesMut, len: usize, short_offset: u8, long_offset: u8) {
    if len <= 55 {
        buf.put_u8(short_offset + len as u8);
    } else {
        let len_bytes = (len as u64).to_be_bytes();
        let len_bytes = trim_leading_zeros(&len_bytes);
        buf.put_u8(long_offset + len_bytes.len() as u8);
        buf.put_slice(len_bytes);
    }
}

/// RLP encode a byte string
pub fn rlp_bytes(buf: &mut BytesMut, value: &[u8]) {
    if value.len() == 1 && value[0] < 0x80 {
        buf.put_u8(value[0]);
    } else {
        rlp_length_prefix(buf, value.len(), 0x80, 0xb7);
        buf.put_slice(value);
    }
}

/// RLP encode an unsigned integer, zero is the empty string
pub fn rlp_uint(buf: &mut BytesMut, value: U256) {
    let be = value.to_be_bytes();
    rlp_bytes(buf, trim_leading_zeros(&be));
}

/// Wrap already encoded items into a RLP list
pub fn rlp_list(items: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(items.len() + 9);
    rlp_length_prefix(&mut buf, items.len(), 0xc0, 0xf7);
    buf.put_slice(items);
    buf
}

/// Pre EIP-1559 transaction, replay protected with EIP-155
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyTransaction {
    /// Sender nonce
    pub nonce: u64,
    /// Gas price in wei
    pub gas_price: U256,
    /// Gas limit
    pub gas_limit: u64,
    /// Destination contract
    pub to: Address,
    /// Transferred value in wei
    pub value: U256,
    /// Call data
    pub data: Vec<u8>,
    /// Chain ID
    pub chain_id: u64,
}

impl LegacyTransaction {
    fn encode_fields(&self, buf: &mut BytesMut) {
        rlp_uint(buf, U256::from(self.nonce));
        rlp_uint(buf, self.gas_price);
        rlp_uint(buf, U256::from(self.gas_limit));
        rlp_bytes(buf, &self.to);
        rlp_uint(buf, self.value);
        rlp_bytes(buf, &self.data);
    }

    /// RLP of the unsigned transaction with `(chainId, 0, 0)` appended
    pub fn signing_payload(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(128 + self.data.len());
        self.encode_fields(&mut buf);
        rlp_uint(&mut buf, U256::from(self.chain_id));
        rlp_uint(&mut buf, U256::ZERO);
        rlp_uint(&mut buf, U256::ZERO);
        rlp_list(&buf)
    }

    /// Transaction hash the sender signs
    pub fn signing_hash(&self) -> [u8; 32] {
        keccak256(&self.signing_payload())
    }

    /// Sign and return the raw transaction for `eth_sendRawTransaction`
    pub fn sign(&self, secret_key: &SecretKey) -> Vec<u8> {
        let message = Message::parse(&self.signing_hash());
        let (signature, recovery_id) = sign(&message, secret_key);
        let recovery_id: u8 = recovery_id.into();
        // v = recovery id + chainId * 2 + 35
        let v = U256::from(recovery_id as u64)
            + U256::from(self.chain_id) * U256::from(2u64)
            + U256::from(35u64);

        let mut buf = BytesMut::with_capacity(192 + self.data.len());
        self.encode_fields(&mut buf);
        rlp_uint(&mut buf, v);
        rlp_uint(&mut buf, U256::from_be_bytes(signature.r.b32()));
        rlp_uint(&mut buf, U256::from_be_bytes(signature.s.b32()));
        rlp_list(&buf).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::{format_address, parse_address, rlp_bytes, rlp_list, rlp_uint, LegacyTransaction};
    use bytes::BytesMut;
    use ethnum::U256;
    use tai_vrf::secp256k1::SecretKey;

    fn eip155_example() -> LegacyTransaction {
        LegacyTransaction {
            nonce: 9,
            gas_price: U256::from(20_000_000_000u64),
            gas_limit: 21000,
            to: [0x35; 20],
            value: U256::from(1_000_000_000_000_000_000u64),
            data: vec![],
            chain_id: 1,
        }
    }

    #[test]
    fn address_must_be_prefixed_hex() {
        let address = parse_address("0x5FbDB2315678afecb367f032d93F642f64180aa3").unwrap();
        assert_eq!(
            format_address(&address),
            "0x5fbdb2315678afecb367f032d93f642f64180aa3"
        );
        assert!(parse_address("5FbDB2315678afecb367f032d93F642f64180aa3").is_err());
        assert!(parse_address("0x5FbDB2315678afecb367f032d93F642f64180aa").is_err());
        assert!(parse_address("0xZZbDB2315678afecb367f032d93F642f64180aa3").is_err());
    }

    #[test]
    fn rlp_short_and_long_strings() {
        let mut buf = BytesMut::new();
        rlp_bytes(&mut buf, b"dog");
        assert_eq!(&buf[..], &[0x83, b'd', b'o', b'g']);

        let mut buf = BytesMut::new();
        rlp_bytes(&mut buf, &[0x7f]);
        assert_eq!(&buf[..], &[0x7f]);

        let mut buf = BytesMut::new();
        rlp_bytes(&mut buf, &[0x80]);
        assert_eq!(&buf[..], &[0x81, 0x80]);

        let long = [0xaa; 56];
        let mut buf = BytesMut::new();
        rlp_bytes(&mut buf, &long);
        assert_eq!(&buf[..2], &[0xb8, 56]);
        assert_eq!(buf.len(), 58);
    }

    #[test]
    fn rlp_integers_and_lists() {
        let mut buf = BytesMut::new();
        rlp_uint(&mut buf, U256::ZERO);
        rlp_uint(&mut buf, U256::from(15u64));
        rlp_uint(&mut buf, U256::from(1024u64));
        assert_eq!(&buf[..], &[0x80, 0x0f, 0x82, 0x04, 0x00]);
        assert_eq!(&rlp_list(&[])[..], &[0xc0]);
        assert_eq!(&rlp_list(&buf)[..], &[0xc5, 0x80, 0x0f, 0x82, 0x04, 0x00]);
    }

    #[test]
    fn eip155_signing_payload() {
        let tx = eip155_example();
        assert_eq!(
            hex::encode(tx.signing_payload()),
            "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );
        assert_eq!(
            hex::encode(tx.signing_hash()),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn eip155_signed_transaction() {
        let secret_key = SecretKey::parse(&[0x46; 32]).unwrap();
        let raw = eip155_example().sign(&secret_key);
        assert_eq!(
            hex::encode(&raw),
            "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
        // v = 37 on mainnet with recovery id 0
        assert_eq!(raw[43], 0x25);
    }
}
