//! Minimal Solidity ABI codec for the handful of calls the worker makes.
use crate::{error::Error, ethereum::Address};
use bytes::{BufMut, BytesMut};
use ethnum::U256;
use tai_vrf::helper::keccak256;

const WORD: usize = 32;

/// `getMockRequests() returns (uint256[])`
pub const GET_MOCK_REQUESTS: &str = "getMockRequests()";
/// `fulfillMockRandomness()`
pub const FULFILL_MOCK_RANDOMNESS: &str = "fulfillMockRandomness()";
/// `useMockVRF() returns (bool)`
pub const USE_MOCK_VRF: &str = "useMockVRF()";
/// `shouldProgressLoop() returns (bool, bytes)`
pub const SHOULD_PROGRESS_LOOP: &str = "shouldProgressLoop()";
/// `progressLoop(bytes)`
pub const PROGRESS_LOOP: &str = "progressLoop(bytes)";
/// `_loopID() returns (uint256)`
pub const LOOP_ID: &str = "_loopID()";
/// `controllerKeyRegistered(address) returns (bool)`
pub const CONTROLLER_KEY_REGISTERED: &str = "controllerKeyRegistered(address)";
/// `registerControllerKey(address, uint256, uint256)`
pub const REGISTER_CONTROLLER_KEY: &str = "registerControllerKey(address,uint256,uint256)";
/// `useAutoLoopVRF() returns (bool)`
pub const USE_AUTOLOOP_VRF: &str = "useAutoLoopVRF()";
/// `setUseAutoLoopVRF(bool)`
pub const SET_USE_AUTOLOOP_VRF: &str = "setUseAutoLoopVRF(bool)";
/// `setVRFSubscriptionID(uint64)`, a zero subscription switches to mock VRF
pub const SET_VRF_SUBSCRIPTION_ID: &str = "setVRFSubscriptionID(uint64)";
/// `useChainlinkVRF() returns (bool)`
pub const USE_CHAINLINK_VRF: &str = "useChainlinkVRF()";
/// `getActiveGames() returns (uint256[])`
pub const GET_ACTIVE_GAMES: &str = "getActiveGames()";

/// First 4 bytes of keccak256 of the function signature
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Left padded address word
pub fn address_word(address: &Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address);
    word
}

/// Big endian uint256 word
pub fn uint_word(value: U256) -> [u8; WORD] {
    value.to_be_bytes()
}

/// Bool word
pub fn bool_word(value: bool) -> [u8; WORD] {
    uint_word(if value { U256::ONE } else { U256::ZERO })
}

/// Call data of a function with static arguments only
pub fn encode_call(signature: &str, args: &[[u8; WORD]]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(4 + args.len() * WORD);
    buf.put_slice(&selector(signature));
    for arg in args {
        buf.put_slice(arg);
    }
    buf.to_vec()
}

/// Call data of a function with a single `bytes` argument
pub fn encode_bytes_call(signature: &str, data: &[u8]) -> Vec<u8> {
    let padded = data.len().div_ceil(WORD) * WORD;
    let mut buf = BytesMut::with_capacity(4 + 2 * WORD + padded);
    buf.put_slice(&selector(signature));
    buf.put_slice(&uint_word(U256::from(WORD as u64)));
    buf.put_slice(&uint_word(U256::from(data.len() as u64)));
    buf.put_slice(data);
    buf.put_bytes(0, padded - data.len());
    buf.to_vec()
}

fn word_at(data: &[u8], index: usize) -> Result<U256, Error> {
    let start = index * WORD;
    let slice = data
        .get(start..start + WORD)
        .ok_or(Error::EncodingMismatch("return data too short"))?;
    let mut word = [0u8; WORD];
    word.copy_from_slice(slice);
    Ok(U256::from_be_bytes(word))
}

fn offset_at(data: &[u8], index: usize) -> Result<usize, Error> {
    let offset = word_at(data, index)?;
    if offset > U256::from(data.len() as u64) || offset.as_usize() % WORD != 0 {
        return Err(Error::EncodingMismatch("invalid dynamic offset"));
    }
    Ok(offset.as_usize())
}

fn bool_from_word(word: U256) -> Result<bool, Error> {
    if word == U256::ZERO {
        Ok(false)
    } else if word == U256::ONE {
        Ok(true)
    } else {
        Err(Error::EncodingMismatch("bool out of range"))
    }
}

/// Decode a single `bool` return value
pub fn decode_bool(data: &[u8]) -> Result<bool, Error> {
    bool_from_word(word_at(data, 0)?)
}

/// Decode a single `uint256` return value
pub fn decode_uint(data: &[u8]) -> Result<U256, Error> {
    word_at(data, 0)
}

/// Decode a single `uint256[]` return value
pub fn decode_uint_array(data: &[u8]) -> Result<Vec<U256>, Error> {
    let offset = offset_at(data, 0)?;
    let length = word_at(data, offset / WORD)?;
    let remaining = (data.len() - offset) / WORD;
    if length >= U256::from(remaining as u64) {
        return Err(Error::EncodingMismatch("array length exceeds return data"));
    }
    (0..length.as_usize())
        .map(|i| word_at(data, offset / WORD + 1 + i))
        .collect()
}

/// Decode a `(bool, bytes)` return value
pub fn decode_bool_bytes(data: &[u8]) -> Result<(bool, Vec<u8>), Error> {
    let flag = bool_from_word(word_at(data, 0)?)?;
    let offset = offset_at(data, 1)?;
    let length = word_at(data, offset / WORD)?;
    let start = offset + WORD;
    let available = data.len().saturating_sub(start);
    if length > U256::from(available as u64) {
        return Err(Error::EncodingMismatch("bytes length exceeds return data"));
    }
    let length = length.as_usize();
    Ok((flag, data[start..start + length].to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(hex_words: &[&str]) -> Vec<u8> {
        hex_words
            .iter()
            .flat_map(|w| hex::decode(format!("{:0>64}", w)).unwrap())
            .collect()
    }

    #[test]
    fn selectors_match_solidity() {
        assert_eq!(
            hex::encode(selector("transfer(address,uint256)")),
            "a9059cbb"
        );
        assert_eq!(hex::encode(selector(GET_MOCK_REQUESTS)), "bd86d09c");
        assert_eq!(hex::encode(selector(FULFILL_MOCK_RANDOMNESS)), "91227fef");
        assert_eq!(hex::encode(selector(USE_MOCK_VRF)), "3f0e397d");
        assert_eq!(hex::encode(selector(SHOULD_PROGRESS_LOOP)), "7c8af710");
        assert_eq!(hex::encode(selector(PROGRESS_LOOP)), "06ecb743");
        assert_eq!(hex::encode(selector(LOOP_ID)), "9a93f93d");
        assert_eq!(hex::encode(selector(CONTROLLER_KEY_REGISTERED)), "afe11f69");
        assert_eq!(hex::encode(selector(REGISTER_CONTROLLER_KEY)), "1bfa3a46");
        assert_eq!(hex::encode(selector(USE_AUTOLOOP_VRF)), "a580f5f4");
        assert_eq!(hex::encode(selector(SET_USE_AUTOLOOP_VRF)), "968cb73c");
        assert_eq!(hex::encode(selector(SET_VRF_SUBSCRIPTION_ID)), "39a3c9fb");
        assert_eq!(hex::encode(selector(USE_CHAINLINK_VRF)), "d404c1df");
        assert_eq!(hex::encode(selector(GET_ACTIVE_GAMES)), "1b76929c");
    }

    #[test]
    fn static_call_layout() {
        let controller = [0x11u8; 20];
        let data = encode_call(
            REGISTER_CONTROLLER_KEY,
            &[
                address_word(&controller),
                uint_word(U256::from(7u64)),
                uint_word(U256::from(9u64)),
            ],
        );
        assert_eq!(data.len(), 4 + 3 * 32);
        assert_eq!(&data[..4], &selector(REGISTER_CONTROLLER_KEY));
        assert!(data[4..16].iter().all(|b| *b == 0));
        assert_eq!(&data[16..36], &controller);
        assert_eq!(data[67], 7);
        assert_eq!(data[99], 9);
    }

    #[test]
    fn bytes_call_is_padded() {
        let data = encode_bytes_call(PROGRESS_LOOP, &[0xab; 33]);
        assert_eq!(data.len(), 4 + 4 * 32);
        assert_eq!(data[4 + 31], 0x20);
        assert_eq!(data[4 + 63], 33);
        assert!(data[4 + 64..4 + 97].iter().all(|b| *b == 0xab));
        assert!(data[4 + 97..].iter().all(|b| *b == 0));

        let empty = encode_bytes_call(PROGRESS_LOOP, &[]);
        assert_eq!(empty.len(), 4 + 2 * 32);
    }

    #[test]
    fn decode_static_values() {
        assert!(decode_bool(&words(&["1"])).unwrap());
        assert!(!decode_bool(&words(&["0"])).unwrap());
        assert_eq!(
            decode_bool(&words(&["2"])),
            Err(Error::EncodingMismatch("bool out of range"))
        );
        assert!(decode_bool(&[]).is_err());
        assert_eq!(decode_uint(&words(&["2a"])).unwrap(), U256::from(42u64));
    }

    #[test]
    fn decode_dynamic_array() {
        let data = words(&["20", "3", "0", "5", "0"]);
        assert_eq!(
            decode_uint_array(&data).unwrap(),
            vec![U256::ZERO, U256::from(5u64), U256::ZERO]
        );
        assert!(decode_uint_array(&words(&["20", "0"])).unwrap().is_empty());
        assert!(decode_uint_array(&words(&["20", "4", "1"])).is_err());
        assert!(decode_uint_array(&words(&["40", "0"])).is_err());
    }

    #[test]
    fn decode_flag_and_payload() {
        let data = words(&[
            "1",
            "40",
            "3",
            "abcdef0000000000000000000000000000000000000000000000000000000000",
        ]);
        assert_eq!(
            decode_bool_bytes(&data).unwrap(),
            (true, vec![0xab, 0xcd, 0xef])
        );
        assert_eq!(
            decode_bool_bytes(&words(&["0", "40", "0"])).unwrap(),
            (false, vec![])
        );
        assert!(decode_bool_bytes(&words(&["1", "40", "21", "0"])).is_err());
    }
}
