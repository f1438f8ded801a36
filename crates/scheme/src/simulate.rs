// Path: crates/scheme/src/simulate.rs
//! Local protocol simulation: runs several state machines of the same
//! protocol in one process with automatic message routing. Used by the DKG
//! ceremony driver, where all parties run server-side.

use std::collections::VecDeque;

use round_based::state_machine::{ProceedResult, StateMachine};
use round_based::{Incoming, MessageDestination, MessageType};

/// Upper bound on scheduler passes; a correct protocol finishes in far
/// fewer, and a buggy one must not spin forever.
const MAX_PASSES: usize = 100_000;

/// Drives all `parties` to completion, routing messages between them.
/// Returns one output per party, in input order.
pub fn run<S>(mut parties: Vec<S>) -> Result<Vec<S::Output>, String>
where
    S: StateMachine,
    S::Msg: Clone,
{
    let n = parties.len();
    let mut queues: Vec<VecDeque<Incoming<S::Msg>>> = (0..n).map(|_| VecDeque::new()).collect();
    let mut wants_msg = vec![false; n];
    let mut outputs: Vec<Option<S::Output>> = (0..n).map(|_| None).collect();
    let mut done = 0;
    let mut next_id: u64 = 0;

    for _ in 0..MAX_PASSES {
        for i in 0..n {
            if outputs[i].is_some() {
                continue;
            }

            loop {
                if wants_msg[i] {
                    match queues[i].pop_front() {
                        Some(msg) => {
                            parties[i]
                                .received_msg(msg)
                                .map_err(|_| format!("party {i} rejected a routed message"))?;
                            wants_msg[i] = false;
                        }
                        // Starved; move on to the next party.
                        None => break,
                    }
                }

                match parties[i].proceed() {
                    ProceedResult::SendMsg(outgoing) => match outgoing.recipient {
                        MessageDestination::AllParties => {
                            for j in 0..n {
                                if j != i {
                                    queues[j].push_back(Incoming {
                                        id: next_id,
                                        sender: i as u16,
                                        msg_type: MessageType::Broadcast,
                                        msg: outgoing.msg.clone(),
                                    });
                                    next_id += 1;
                                }
                            }
                        }
                        MessageDestination::OneParty(dest) => {
                            queues[dest as usize].push_back(Incoming {
                                id: next_id,
                                sender: i as u16,
                                msg_type: MessageType::P2P,
                                msg: outgoing.msg,
                            });
                            next_id += 1;
                        }
                    },
                    ProceedResult::NeedsOneMoreMessage => {
                        wants_msg[i] = true;
                    }
                    ProceedResult::Output(output) => {
                        outputs[i] = Some(output);
                        done += 1;
                        break;
                    }
                    ProceedResult::Yielded => {}
                    ProceedResult::Error(e) => {
                        return Err(format!("party {i} protocol error: {e}"));
                    }
                }
            }
        }

        if done == n {
            break;
        }
    }

    if done < n {
        return Err(format!("protocol stalled: {done}/{n} parties finished"));
    }

    outputs
        .into_iter()
        .enumerate()
        .map(|(i, o)| o.ok_or_else(|| format!("party {i} produced no output")))
        .collect()
}
