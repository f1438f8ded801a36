// Path: crates/scheme/src/session.rs
//! Per-party signing session state.
//!
//! The `cggmp24` signing state machine borrows its key share, execution id,
//! party list, rng, and prehashed message for its whole lifetime. To keep a
//! session alive across independent HTTP round trips those inputs are
//! leaked to `'static` and reclaimed in `Drop`, state machine first.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use generic_ec::Scalar;
use rand::rngs::OsRng;
use round_based::state_machine::{ProceedResult, StateMachine};
use round_based::{Incoming, MessageDestination, MessageType};
use serde::{de::DeserializeOwned, Serialize};
use std::mem::ManuallyDrop;

use cggmp24::security_level::SecurityLevel128;
use cggmp24::signing::PrehashedDataToSign;
use cggmp24::supported_curves::Secp256k1;

use warden_api::scheme::RawSignature;
use warden_types::error::SchemeError;
use warden_types::peer::PeerMessage;

type ServerKeyShare = cggmp24::KeyShare<Secp256k1, SecurityLevel128>;

/// One step of driving the protocol.
enum Step {
    /// The protocol emitted an outgoing message.
    Send(PeerMessage),
    /// The protocol is blocked on peer input.
    NeedsInput,
    /// The protocol finished with a signature.
    Finished(RawSignature),
    /// The protocol yielded; keep driving.
    Yielded,
}

/// Object-safe facade over the unnameable concrete `StateMachine` type.
trait ErasedSigning {
    fn drive_one(&mut self, own_keygen_index: u16, parties: &[u16]) -> Result<Step, SchemeError>;
    fn deliver(&mut self, sender_position: u16, is_broadcast: bool, payload_b64: &str)
        -> Result<(), SchemeError>;
}

struct Erased<SM: StateMachine> {
    sm: SM,
}

impl<SM> ErasedSigning for Erased<SM>
where
    SM: StateMachine<
        Output = Result<
            cggmp24::signing::Signature<Secp256k1>,
            cggmp24::signing::SigningError,
        >,
    >,
    SM::Msg: Serialize + DeserializeOwned + Clone,
{
    fn drive_one(&mut self, own_keygen_index: u16, parties: &[u16]) -> Result<Step, SchemeError> {
        match self.sm.proceed() {
            ProceedResult::SendMsg(outgoing) => {
                let json = serde_json::to_vec(&outgoing.msg)
                    .map_err(|e| SchemeError::Round(format!("serialize outgoing: {e}")))?;
                let payload = BASE64.encode(json);

                // The protocol addresses parties by 0-based position within
                // the signing group; the wire carries keygen indices.
                let (is_broadcast, recipient) = match outgoing.recipient {
                    MessageDestination::AllParties => (true, None),
                    MessageDestination::OneParty(position) => {
                        let keygen = parties.get(position as usize).copied().unwrap_or(position);
                        (false, Some(keygen))
                    }
                };

                Ok(Step::Send(PeerMessage {
                    sender: own_keygen_index,
                    is_broadcast,
                    recipient,
                    payload,
                }))
            }
            ProceedResult::NeedsOneMoreMessage => Ok(Step::NeedsInput),
            ProceedResult::Output(result) => {
                let signature = result
                    .map_err(|e| SchemeError::Round(format!("signing protocol: {e:?}")))?
                    // Ethereum requires the low-s form.
                    .normalize_s();

                let mut bytes =
                    vec![0u8; cggmp24::signing::Signature::<Secp256k1>::serialized_len()];
                signature.write_to_slice(&mut bytes);

                let mut r = [0u8; 32];
                let mut s = [0u8; 32];
                r.copy_from_slice(&bytes[..32]);
                s.copy_from_slice(&bytes[32..]);
                Ok(Step::Finished(RawSignature { r, s }))
            }
            ProceedResult::Yielded => Ok(Step::Yielded),
            ProceedResult::Error(e) => Err(SchemeError::Round(format!("protocol error: {e}"))),
        }
    }

    fn deliver(
        &mut self,
        sender_position: u16,
        is_broadcast: bool,
        payload_b64: &str,
    ) -> Result<(), SchemeError> {
        let json = BASE64
            .decode(payload_b64)
            .map_err(|e| SchemeError::Round(format!("base64 decode incoming: {e}")))?;
        let msg: SM::Msg = serde_json::from_slice(&json)
            .map_err(|e| SchemeError::Round(format!("deserialize incoming: {e}")))?;

        let incoming = Incoming {
            // Message ids are unused by the protocol implementation.
            id: 0,
            sender: sender_position,
            msg_type: if is_broadcast {
                MessageType::Broadcast
            } else {
                MessageType::P2P
            },
            msg,
        };

        self.sm
            .received_msg(incoming)
            .map_err(|_| SchemeError::Round("state machine rejected message".into()))
    }
}

/// A signing session owning the type-erased state machine and the leaked
/// inputs it borrows.
pub(crate) struct SignSession {
    /// Dropped first; it references the leaked data below.
    sm: ManuallyDrop<Box<dyn ErasedSigning>>,
    /// This party's keygen index.
    party_index: u16,
    /// Keygen indices of the signing group, ascending.
    parties_at_keygen: Vec<u16>,
    key_share_ptr: *mut ServerKeyShare,
    rng_ptr: *mut OsRng,
    prehashed_ptr: *mut PrehashedDataToSign<Secp256k1>,
    eid_ptr: *mut [u8],
    parties_ptr: *mut [u16],
    /// Set once the protocol completes.
    pub(crate) signature: Option<RawSignature>,
}

// SAFETY: the session exclusively owns everything behind its pointers
// (created from `Box::into_raw`, reclaimed only in `Drop`) and the state
// machine that borrows them; nothing is shared outside this struct, and
// the engine's table only ever hands a session to one thread at a time
// through a `Mutex`.
unsafe impl Send for SignSession {}

impl Drop for SignSession {
    fn drop(&mut self) {
        // 1. Drop the state machine first (it references the leaked data).
        unsafe {
            ManuallyDrop::drop(&mut self.sm);
        }
        // 2. Reclaim the leaked inputs. `KeyShare` zeroizes its own
        //    secret scalar on drop.
        unsafe {
            drop(Box::from_raw(self.key_share_ptr));
            drop(Box::from_raw(self.rng_ptr));
            drop(Box::from_raw(self.prehashed_ptr));
            drop(Box::from_raw(self.eid_ptr));
            drop(Box::from_raw(self.parties_ptr));
        }
    }
}

impl SignSession {
    /// Builds the per-party state machine and drives it to its first
    /// blocked point, collecting the initial outgoing messages.
    pub(crate) fn start(
        core_share: &[u8],
        aux_info: &[u8],
        message_hash: [u8; 32],
        party_index: u16,
        parties_at_keygen: &[u16],
        eid: [u8; 32],
    ) -> Result<(Self, Vec<PeerMessage>), SchemeError> {
        let incomplete: cggmp24::IncompleteKeyShare<Secp256k1> = serde_json::from_slice(core_share)
            .map_err(|e| SchemeError::CreateSession(format!("deserialize core share: {e}")))?;
        let aux: cggmp24::key_share::AuxInfo<SecurityLevel128> = serde_json::from_slice(aux_info)
            .map_err(|e| SchemeError::CreateSession(format!("deserialize aux info: {e}")))?;
        let key_share = cggmp24::KeyShare::from_parts((incomplete, aux))
            .map_err(|e| SchemeError::CreateSession(format!("combine key share: {e}")))?;

        let position = parties_at_keygen
            .iter()
            .position(|&p| p == party_index)
            .ok_or_else(|| {
                SchemeError::CreateSession(format!(
                    "party {party_index} not in signing group {parties_at_keygen:?}"
                ))
            })? as u16;

        // Leak the borrowed inputs to 'static; reclaimed in Drop.
        let key_share_ptr = Box::into_raw(Box::new(key_share));
        let scalar = Scalar::<Secp256k1>::from_be_bytes_mod_order(message_hash);
        let prehashed_ptr = Box::into_raw(Box::new(PrehashedDataToSign::from_scalar(scalar)));
        let rng_ptr = Box::into_raw(Box::new(OsRng));

        let key_share_ref: &'static ServerKeyShare = unsafe { &*key_share_ptr };
        let prehashed_ref: &'static PrehashedDataToSign<Secp256k1> = unsafe { &*prehashed_ptr };
        let rng_ref: &'static mut OsRng = unsafe { &mut *rng_ptr };

        let eid_ptr = Box::into_raw(eid.to_vec().into_boxed_slice());
        let parties_ptr = Box::into_raw(parties_at_keygen.to_vec().into_boxed_slice());
        let eid_static: &'static [u8] = unsafe { &*eid_ptr };
        let parties_static: &'static [u16] = unsafe { &*parties_ptr };

        let execution_id = cggmp24::ExecutionId::new(eid_static);
        let sm = cggmp24::signing(execution_id, position, parties_static, key_share_ref)
            .enforce_reliable_broadcast(true)
            .sign_sync(rng_ref, prehashed_ref);

        let mut session = SignSession {
            sm: ManuallyDrop::new(Box::new(Erased { sm })),
            party_index,
            parties_at_keygen: parties_at_keygen.to_vec(),
            key_share_ptr,
            rng_ptr,
            prehashed_ptr,
            eid_ptr,
            parties_ptr,
            signature: None,
        };

        let first_messages = session.drive()?;
        Ok((session, first_messages))
    }

    /// Delivers the peer's messages, driving the protocol after each one.
    /// With no messages this still drives once, flushing buffered output.
    pub(crate) fn process_round(
        &mut self,
        incoming: &[PeerMessage],
    ) -> Result<Vec<PeerMessage>, SchemeError> {
        let mut outgoing = Vec::new();
        let mut delivered = 0u32;

        for msg in incoming {
            // P2P traffic not addressed to this party is silently skipped;
            // a relaying peer may batch messages for several recipients.
            if !msg.is_broadcast && msg.recipient.is_some_and(|r| r != self.party_index) {
                continue;
            }

            let sender_position = self
                .parties_at_keygen
                .iter()
                .position(|&p| p == msg.sender)
                .ok_or_else(|| {
                    SchemeError::Round(format!(
                        "unknown sender {} for group {:?}",
                        msg.sender, self.parties_at_keygen
                    ))
                })? as u16;

            self.sm
                .deliver(sender_position, msg.is_broadcast, &msg.payload)?;
            delivered += 1;

            outgoing.extend(self.drive()?);
        }

        if delivered == 0 {
            outgoing.extend(self.drive()?);
        }

        Ok(outgoing)
    }

    /// True once the protocol has produced a signature.
    pub(crate) fn is_complete(&self) -> bool {
        self.signature.is_some()
    }

    /// Drives the state machine until it blocks on input or finishes.
    fn drive(&mut self) -> Result<Vec<PeerMessage>, SchemeError> {
        let mut messages = Vec::new();
        loop {
            match self.sm.drive_one(self.party_index, &self.parties_at_keygen)? {
                Step::Send(msg) => messages.push(msg),
                Step::NeedsInput => break,
                Step::Finished(signature) => {
                    self.signature = Some(signature);
                    break;
                }
                Step::Yielded => {}
            }
        }
        Ok(messages)
    }
}
