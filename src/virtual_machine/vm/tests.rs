use super::*;
use crate::types::address::Address;
use crate::types::word::Word;
use crate::virtual_machine::abi::{self, Token};
use crate::virtual_machine::command::{
    Arg, FALLBACK_SELECTOR, FLAG_ABI_TAIL, FLAG_STATE_INPUT, FLAG_TUPLE_RETURN, Output, Selector,
    selector_of,
};
use crate::virtual_machine::dispatch::{CallKind, CallOutcome, Message};
use std::collections::HashMap;

type Handler = fn(&[u8]) -> Result<Vec<u8>, Vec<u8>>;

const LIB: Address = Address([0x11; 20]);

/// A host mapping selectors on one library address to plain functions.
#[derive(Default)]
struct TestHost {
    handlers: HashMap<Selector, Handler>,
    /// (kind, target, value, input) of every dispatched call.
    calls: Vec<(CallKind, Address, Word, Vec<u8>)>,
}

impl TestHost {
    fn new() -> Self {
        let mut host = Self::default();
        host.register("add(uint256,uint256)", add);
        host.register("strcat(string,string)", strcat);
        host.register("fail()", fail);
        host.register("intTuple()", int_tuple);
        host.register("extractElement(bytes,uint256)", extract_element);
        host.register("addSlots(uint256,uint256,uint256,bytes[])", add_slots);
        host.register("countSlots(bytes[])", count_slots);
        host.register("wrap(uint256)", wrap);
        host.register("sequence(uint256)", sequence);
        host.register("sum(uint256[])", sum);
        host.handlers.insert(FALLBACK_SELECTOR, echo);
        host
    }

    fn register(&mut self, signature: &str, handler: Handler) {
        self.handlers.insert(selector_of(signature), handler);
    }
}

impl Host for TestHost {
    fn call(&mut self, msg: Message<'_>) -> CallOutcome {
        self.calls
            .push((msg.kind, msg.target, msg.value, msg.input.to_vec()));
        if msg.target != LIB {
            return CallOutcome::failure(Vec::new());
        }
        let (selector, body) = if msg.input.len() >= 4 {
            let mut sel = [0u8; 4];
            sel.copy_from_slice(&msg.input[..4]);
            if sel != FALLBACK_SELECTOR && self.handlers.contains_key(&sel) {
                (sel, &msg.input[4..])
            } else {
                (FALLBACK_SELECTOR, msg.input)
            }
        } else {
            (FALLBACK_SELECTOR, msg.input)
        };
        let Some(handler) = self.handlers.get(&selector) else {
            return CallOutcome::failure(Vec::new());
        };
        match handler(body) {
            Ok(data) => CallOutcome::success(data),
            Err(payload) => CallOutcome::failure(payload),
        }
    }
}

fn empty<E>(_: E) -> Vec<u8> {
    Vec::new()
}

fn add(body: &[u8]) -> Result<Vec<u8>, Vec<u8>> {
    let a = abi::word_at(body, 0).map_err(empty)?;
    let b = abi::word_at(body, 1).map_err(empty)?;
    a.checked_add(&b)
        .map(|w| w.0.to_vec())
        .ok_or_else(|| RevertData::reason("overflow").0)
}

fn strcat(body: &[u8]) -> Result<Vec<u8>, Vec<u8>> {
    let mut a = abi::decode_bytes_at(body, 0).map_err(empty)?;
    let b = abi::decode_bytes_at(body, 1).map_err(empty)?;
    a.extend(b);
    Ok(abi::encode_bytes(&a))
}

fn fail(_: &[u8]) -> Result<Vec<u8>, Vec<u8>> {
    Err(RevertData::reason("Hello World!").0)
}

fn int_tuple(_: &[u8]) -> Result<Vec<u8>, Vec<u8>> {
    Ok([Word::from_u64(0xbad).0, Word::from_u64(0xdeed).0].concat())
}

fn extract_element(body: &[u8]) -> Result<Vec<u8>, Vec<u8>> {
    let tuple = abi::decode_bytes_at(body, 0).map_err(empty)?;
    let index = abi::word_at(body, 1)
        .ok()
        .and_then(|w| w.to_usize())
        .ok_or_else(Vec::<u8>::new)?;
    abi::word_at(&tuple, index)
        .map(|w| w.0.to_vec())
        .map_err(empty)
}

fn add_slots(body: &[u8]) -> Result<Vec<u8>, Vec<u8>> {
    let idx = |i| {
        abi::word_at(body, i)
            .ok()
            .and_then(|w| w.to_usize())
            .ok_or_else(Vec::<u8>::new)
    };
    let (dest, a, b) = (idx(0)?, idx(1)?, idx(2)?);
    let mut state = abi::decode_bytes_array_at(body, 3).map_err(empty)?;
    let word = |i: usize| state.get(i).and_then(|s| Word::from_slice(s)).ok_or_else(Vec::<u8>::new);
    let sum = word(a)?.checked_add(&word(b)?).ok_or_else(Vec::<u8>::new)?;
    *state.get_mut(dest).ok_or_else(Vec::<u8>::new)? = sum.0.to_vec();
    Ok(abi::encode_bytes_array(&state))
}

fn count_slots(body: &[u8]) -> Result<Vec<u8>, Vec<u8>> {
    let state = abi::decode_bytes_array_at(body, 0).map_err(empty)?;
    Ok(Word::from_usize(state.len()).0.to_vec())
}

/// Returns `n` one-byte slots.
fn wrap(body: &[u8]) -> Result<Vec<u8>, Vec<u8>> {
    let n = abi::word_at(body, 0)
        .ok()
        .and_then(|w| w.to_usize())
        .ok_or_else(Vec::<u8>::new)?;
    let items: Vec<Vec<u8>> = (0..n).map(|i| vec![i as u8]).collect();
    Ok(abi::encode_bytes_array(&items))
}

/// Returns `[1, 2, .., n]` as `uint256[]`.
fn sequence(body: &[u8]) -> Result<Vec<u8>, Vec<u8>> {
    let n = abi::word_at(body, 0)
        .ok()
        .and_then(|w| w.to_u128())
        .ok_or_else(Vec::<u8>::new)?;
    let words: Vec<Word> = (1..=n).map(Word::from_u128).collect();
    Ok(abi::encode_words(&words))
}

fn sum(body: &[u8]) -> Result<Vec<u8>, Vec<u8>> {
    let words = abi::decode_words_at(body, 0).map_err(empty)?;
    words
        .iter()
        .try_fold(Word::zero(), |acc, w| acc.checked_add(w))
        .map(|w| w.0.to_vec())
        .ok_or_else(Vec::<u8>::new)
}

fn echo(body: &[u8]) -> Result<Vec<u8>, Vec<u8>> {
    Ok(body.to_vec())
}

fn call(signature: &str, args: &[Arg], output: Output) -> Command {
    Command::new(CallKind::Call, selector_of(signature), LIB)
        .with_args(args)
        .with_output(output)
}

fn word(n: u64) -> Vec<u8> {
    Word::from_u64(n).0.to_vec()
}

fn run(commands: Vec<Command>, state: Vec<Vec<u8>>) -> (Result<Vec<Vec<u8>>, VMError>, TestHost) {
    let mut host = TestHost::new();
    let raw: Vec<[u8; 32]> = commands.iter().map(Command::encode).collect();
    let result = execute(&mut host, &raw, state);
    (result, host)
}

#[test]
fn fibonacci_by_chained_adds() {
    let commands = (0..8u8)
        .map(|i| {
            call(
                "add(uint256,uint256)",
                &[Arg::Static(i), Arg::Static(i + 1)],
                Output::Static(i + 2),
            )
        })
        .collect();
    let (result, host) = run(commands, vec![word(1), word(1)]);
    let state = result.unwrap();
    assert_eq!(state.len(), 10);
    assert_eq!(state[9], word(55));
    assert_eq!(host.calls.len(), 8);
}

#[test]
fn fibonacci_in_two_slots() {
    let commands = (0..8u8)
        .map(|i| {
            call(
                "add(uint256,uint256)",
                &[Arg::Static(0), Arg::Static(1)],
                Output::Static(i % 2),
            )
        })
        .collect();
    let (result, _) = run(commands, vec![word(1), word(1)]);
    let state = result.unwrap();
    assert_eq!(state[1], word(55));
    assert_eq!(state[0], word(34));
}

#[test]
fn strcat_doubles_a_string() {
    let commands = vec![call(
        "strcat(string,string)",
        &[Arg::Dynamic(0), Arg::Dynamic(0)],
        Output::Dynamic(0),
    )];
    let (result, _) = run(commands, vec![b"Hello, world!".to_vec()]);
    assert_eq!(result.unwrap(), vec![b"Hello, world!Hello, world!".to_vec()]);
}

#[test]
fn inputs_see_previous_outputs() {
    let commands = vec![
        call("add(uint256,uint256)", &[Arg::Static(0), Arg::Static(0)], Output::Static(0)),
        call("add(uint256,uint256)", &[Arg::Static(0), Arg::Static(0)], Output::Static(1)),
    ];
    let (result, host) = run(commands, vec![word(3)]);
    assert_eq!(result.unwrap(), vec![word(6), word(12)]);
    assert_eq!(&host.calls[1].3[4..36], word(6).as_slice());
}

#[test]
fn discard_leaves_state_unchanged() {
    let initial = vec![word(5), b"abc".to_vec()];
    let commands = vec![
        call("add(uint256,uint256)", &[Arg::Static(0), Arg::Static(0)], Output::Discard),
        call("strcat(string,string)", &[Arg::Dynamic(1), Arg::Dynamic(1)], Output::Discard),
    ];
    let (result, host) = run(commands, initial.clone());
    assert_eq!(result.unwrap(), initial);
    assert_eq!(host.calls.len(), 2);
}

#[test]
fn replace_state_grows_and_shrinks() {
    let grow = vec![call("wrap(uint256)", &[Arg::Static(0)], Output::ReplaceState)];
    let (result, _) = run(grow, vec![word(5)]);
    let state = result.unwrap();
    assert_eq!(state.len(), 5);
    assert_eq!(state[4], vec![4]);

    let shrink = vec![call("wrap(uint256)", &[Arg::Static(0)], Output::ReplaceState)];
    let mut initial = vec![word(1)];
    initial.extend((0..9u8).map(|i| vec![i; 3]));
    let (result, _) = run(shrink, initial);
    assert_eq!(result.unwrap(), vec![vec![0]]);
}

#[test]
fn whole_state_in_and_out() {
    let commands = vec![call(
        "addSlots(uint256,uint256,uint256,bytes[])",
        &[Arg::Static(0), Arg::Static(1), Arg::Static(2), Arg::State],
        Output::ReplaceState,
    )];
    let (result, _) = run(commands, vec![word(0), word(1), word(2)]);
    assert_eq!(result.unwrap(), vec![word(3), word(1), word(2)]);
}

#[test]
fn state_input_flag_passes_whole_state() {
    let commands = vec![
        call("countSlots(bytes[])", &[], Output::Static(2)).with_flags(FLAG_STATE_INPUT),
    ];
    let (result, _) = run(commands, vec![word(1), b"x".to_vec()]);
    assert_eq!(result.unwrap()[2], word(2));
}

#[test]
fn tuple_return_feeds_extraction() {
    let commands = vec![
        call("intTuple()", &[], Output::Static(2)).with_flags(FLAG_TUPLE_RETURN),
        call(
            "extractElement(bytes,uint256)",
            &[Arg::Dynamic(2), Arg::Static(1)],
            Output::Static(0),
        ),
    ];
    let (result, _) = run(commands, vec![word(0), word(1)]);
    let state = result.unwrap();
    assert_eq!(state[2].len(), 64);
    assert_eq!(state[0], word(0xdeed));
}

#[test]
fn failure_stops_the_run_and_keeps_payload() {
    let commands = vec![
        call("add(uint256,uint256)", &[Arg::Static(0), Arg::Static(0)], Output::Static(0)),
        call("fail()", &[], Output::Discard),
        call("add(uint256,uint256)", &[Arg::Static(0), Arg::Static(0)], Output::Static(0)),
    ];
    let (result, host) = run(commands, vec![word(1)]);
    let err = result.unwrap_err();
    assert!(matches!(err, VMError::CalleeFailure { command: 1, .. }));
    assert_eq!(err.revert_data(), Some(RevertData::reason("Hello World!").as_slice()));
    assert_eq!(host.calls.len(), 2);
}

#[test]
fn empty_failure_payload_is_forwarded() {
    let commands = vec![Command::new(CallKind::Call, selector_of("add(uint256,uint256)"), Address::from_low_u8(9))];
    let (result, _) = run(commands, vec![]);
    let err = result.unwrap_err();
    assert_eq!(err.revert_data(), Some(&[][..]));
}

#[test]
fn static_round_trip_is_exact() {
    let value = Word([0xc3; 32]).0.to_vec();
    let commands = vec![
        Command::new(CallKind::Call, FALLBACK_SELECTOR, LIB)
            .with_args(&[Arg::Static(0)])
            .with_output(Output::Static(1)),
        Command::new(CallKind::Call, FALLBACK_SELECTOR, LIB).with_args(&[Arg::Static(1)]),
    ];
    let (result, host) = run(commands, vec![value.clone()]);
    assert_eq!(result.unwrap()[1], value);
    assert_eq!(host.calls[1].3, value);
}

#[test]
fn dynamic_round_trip_is_exact() {
    let content: Vec<u8> = (0..77u8).collect();
    let commands = vec![
        Command::new(CallKind::Call, FALLBACK_SELECTOR, LIB)
            .with_args(&[Arg::Dynamic(0)])
            .with_output(Output::Dynamic(1)),
    ];
    let (result, host) = run(commands, vec![content.clone()]);
    assert_eq!(result.unwrap()[1], content);
    assert_eq!(host.calls[0].3, abi::encode_tokens(&[Token::Bytes(&content)]));
}

#[test]
fn call_kinds_reach_the_host_unchanged() {
    let commands = [CallKind::Delegate, CallKind::Call, CallKind::Static]
        .into_iter()
        .map(|kind| Command::new(kind, FALLBACK_SELECTOR, LIB))
        .collect();
    let (result, host) = run(commands, vec![]);
    result.unwrap();
    let kinds: Vec<CallKind> = host.calls.iter().map(|c| c.0).collect();
    assert_eq!(kinds, [CallKind::Delegate, CallKind::Call, CallKind::Static]);
    assert!(host.calls.iter().all(|c| c.2.is_zero()));
}

#[test]
fn value_call_forwards_value_slot() {
    let commands = vec![
        Command::new(CallKind::Value, FALLBACK_SELECTOR, LIB).with_args(&[Arg::Static(0), Arg::Static(1)]),
    ];
    let (result, host) = run(commands, vec![word(1_000), word(2)]);
    result.unwrap();
    assert_eq!(host.calls[0].0, CallKind::Value);
    assert_eq!(host.calls[0].2, Word::from_u64(1_000));
    assert_eq!(host.calls[0].3, word(2));
}

#[test]
fn invalid_slot_rejected_before_any_call() {
    let commands = vec![
        call("add(uint256,uint256)", &[Arg::Static(0), Arg::Static(0)], Output::Static(0)),
        call("add(uint256,uint256)", &[Arg::Static(0), Arg::Static(4)], Output::Static(0)),
    ];
    let (result, host) = run(commands, vec![word(1)]);
    assert!(matches!(result, Err(VMError::SlotOutOfRange { slot: 4, .. })));
    assert!(host.calls.is_empty());
}

#[test]
fn malformed_record_rejected() {
    let mut host = TestHost::new();
    let raw: Vec<Vec<u8>> = vec![vec![0u8; 32], vec![0u8; 31]];
    let result = execute(&mut host, &raw, vec![]);
    assert!(matches!(
        result,
        Err(VMError::MalformedCommand { index: 1, length: 31 })
    ));
    assert!(host.calls.is_empty());
}

#[test]
fn mismatch_after_replace_is_caught_at_run_time() {
    let commands = vec![
        call("wrap(uint256)", &[Arg::Static(0)], Output::ReplaceState),
        // Slot 0 now holds one byte, not a word.
        call("add(uint256,uint256)", &[Arg::Static(0), Arg::Static(0)], Output::Discard),
    ];
    let (result, host) = run(commands, vec![word(2)]);
    assert!(matches!(result, Err(VMError::EncodingMismatch { .. })));
    assert_eq!(host.calls.len(), 1);
}

#[test]
fn run_only_once() {
    let mut host = TestHost::new();
    let mut vm = VM::new(vec![], vec![word(1)]).unwrap();
    assert_eq!(vm.status(), Status::Ready);
    vm.run(&mut host).unwrap();
    assert_eq!(vm.status(), Status::Completed);
    assert!(matches!(
        vm.run(&mut host),
        Err(VMError::NotReady { status: "Completed" })
    ));
    assert_eq!(vm.into_state(), vec![word(1)]);
}

#[test]
fn aborted_status_and_pc() {
    let mut host = TestHost::new();
    let commands = vec![
        call("fail()", &[], Output::Discard),
        call("fail()", &[], Output::Discard),
    ];
    let mut vm = VM::new(commands, vec![]).unwrap();
    assert!(vm.run(&mut host).is_err());
    assert_eq!(vm.status(), Status::Aborted);
    assert_eq!(vm.pc(), 0);
    assert!(matches!(
        vm.run(&mut host),
        Err(VMError::NotReady { status: "Aborted" })
    ));
    assert_eq!(host.calls.len(), 1);
}

#[test]
fn array_return_feeds_array_argument() {
    let commands = vec![
        call("sequence(uint256)", &[Arg::Static(0)], Output::Dynamic(1)).with_flags(FLAG_ABI_TAIL),
        call("sum(uint256[])", &[Arg::Dynamic(1)], Output::Static(2)).with_flags(FLAG_ABI_TAIL),
    ];
    let (result, host) = run(commands, vec![word(3)]);
    let state = result.unwrap();
    assert_eq!(state[2], word(6));
    // The slot holds the tail: count word, then the elements.
    assert_eq!(state[1].len(), 4 * 32);
    assert_eq!(&state[1][..32], word(3).as_slice());
    // The second call received exactly the bytes the first one returned.
    let returned = abi::encode_words(&[
        Word::from_u64(1),
        Word::from_u64(2),
        Word::from_u64(3),
    ]);
    assert_eq!(&host.calls[1].3[4..], returned.as_slice());
}

#[test]
fn array_return_without_tail_flag_is_not_an_array() {
    // Decoded as `bytes`, a three-element array yields three bytes of its
    // first element rather than the elements themselves.
    let commands = vec![call("sequence(uint256)", &[Arg::Static(0)], Output::Dynamic(1))];
    let (result, _) = run(commands, vec![word(3)]);
    assert_eq!(result.unwrap()[1], vec![0, 0, 0]);
}
