//! Text assembler and disassembler for command scripts.
//!
//! # Syntax
//!
//! ```text
//! slot u256 1                                      # initial state, in order
//! slot str "Hello, world!"
//! alias lib 0x5fbdb2315678afecb367f032d93f642f64180aa3
//! call @lib add(uint256,uint256) s0 s0 -> s2       # one command per line
//! delegatecall @lib strcat(string,string) d1 d1 -> d1
//! ```
//!
//! - Slot kinds: `u256` (decimal or `0x` hex), `word` (exactly 32 bytes of
//!   hex), `addr` (hex or `@alias`), `bool`, `str` (double-quoted, with `\n`,
//!   `\t`, `\r`, `\0`, `\\`, `\"` and `\xNN` escapes), `bytes` (hex)
//! - Call mnemonics: `call`, `delegatecall`, `staticcall`, `valuecall`; the
//!   first argument of a `valuecall` is the static slot holding the value
//! - Targets are `0x` addresses or `@alias` names known to the [`AsmContext`]
//! - Functions are canonical signatures, `fallback`, or a raw `0x` selector
//! - Arguments: `sN` static slot, `dN` dynamic slot, `state` the whole state
//! - Output after `->`: `sN`, `dN`, `state` (replace), `_` (discard, default)
//! - Flags: `+tuple` stores the raw return data, `+stateinput` passes the
//!   whole state instead of the listed arguments, `+abitail` keeps dynamic
//!   slots as ABI tails so `uint256[]` and other arrays keep their count
//! - Comments start with `#`; commas between operands are optional

use crate::error;
use crate::types::address::Address;
use crate::types::hex;
use crate::types::word::{WORD_LEN, Word};
use crate::virtual_machine::command::{
    Arg, Command, FALLBACK_SELECTOR, FLAG_ABI_TAIL, FLAG_STATE_INPUT, FLAG_TUPLE_RETURN,
    MAX_ARGS, MAX_STATE_SLOTS, Output, Selector, selector_of,
};
use crate::virtual_machine::dispatch::CallKind;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::script::Script;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::fs;
use std::path::Path;

const COMMENT_CHAR: char = '#';
const ALIAS_PREFIX: char = '@';
const FLAG_PREFIX: char = '+';
const ARROW: &str = "->";

/// Formats a compiler-style diagnostic for an assembly failure.
///
/// Errors without a source location are rendered as a single line.
pub fn render_assembly_diagnostic(file: &str, source: &str, err: &VMError) -> String {
    let VMError::AssemblyError {
        line,
        offset,
        reason,
    } = err
    else {
        return format!("error: {err}");
    };

    let mut diag = String::new();
    let _ = writeln!(diag, "error: {reason}");
    let _ = writeln!(diag, " --> {file}:{line}:{offset}");

    if let Some(raw_line) = source.lines().nth(line.saturating_sub(1)) {
        let line_text = raw_line.trim_end_matches('\r');
        let underline = " ".repeat(offset.saturating_sub(1));
        let _ = writeln!(diag, "  |");
        let _ = writeln!(diag, "{:>4} | {}", line, line_text);
        let _ = writeln!(diag, "  | {}^", underline);
    }

    diag
}

/// Names usable as `@alias` targets.
#[derive(Clone, Debug, Default)]
pub struct AsmContext {
    aliases: BTreeMap<String, Address>,
}

impl AsmContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context preloaded with `aliases`.
    pub fn with_aliases<I, S>(aliases: I) -> Self
    where
        I: IntoIterator<Item = (S, Address)>,
        S: Into<String>,
    {
        Self {
            aliases: aliases.into_iter().map(|(n, a)| (n.into(), a)).collect(),
        }
    }

    /// Registers `name`, failing if it is already taken.
    pub fn define_alias(&mut self, name: &str, address: Address) -> Result<(), String> {
        if self.aliases.contains_key(name) {
            return Err(format!("alias '{name}' is already defined"));
        }
        self.aliases.insert(name.to_string(), address);
        Ok(())
    }

    pub fn resolve_alias(&self, name: &str) -> Option<Address> {
        self.aliases.get(name).copied()
    }

    /// First alias, in name order, that points at `address`.
    pub fn alias_of(&self, address: Address) -> Option<&str> {
        self.aliases
            .iter()
            .find(|(_, a)| **a == address)
            .map(|(name, _)| name.as_str())
    }
}

#[derive(Debug, Clone)]
struct Token<'a> {
    text: &'a str,
    /// 1-based column offset in the line.
    offset: usize,
}

fn at(line: usize, tok: &Token<'_>, reason: impl Into<String>) -> VMError {
    VMError::AssemblyError {
        line,
        offset: tok.offset,
        reason: reason.into(),
    }
}

/// Tokenize a single line.
///
/// Rules:
/// - `#` starts a comment
/// - whitespace and commas separate tokens, except inside quotes or parentheses
fn tokenize(line_no: usize, line: &str) -> Result<Vec<Token<'_>>, VMError> {
    let mut out = Vec::with_capacity(8);
    let mut start: Option<usize> = None;
    let mut str_start = 0usize;
    let mut in_str = false;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut end = line.len();

    let parse_error = |offset: usize, reason: &str| VMError::AssemblyError {
        line: line_no,
        offset,
        reason: reason.to_string(),
    };

    for (i, c) in line.char_indices() {
        if in_str {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_str = false;
            }
            continue;
        }

        match c {
            COMMENT_CHAR => {
                end = i;
                break;
            }
            '"' => {
                start.get_or_insert(i);
                str_start = i + 1;
                in_str = true;
            }
            '(' => {
                start.get_or_insert(i);
                depth += 1;
            }
            ')' => {
                if depth == 0 {
                    return Err(parse_error(i + 1, "unexpected ')'"));
                }
                depth -= 1;
            }
            c if depth == 0 && (c.is_whitespace() || c == ',') => {
                if let Some(s) = start.take() {
                    out.push(Token {
                        text: &line[s..i],
                        offset: s + 1,
                    });
                }
            }
            _ => {
                start.get_or_insert(i);
            }
        }
    }

    if in_str {
        return Err(parse_error(
            str_start,
            "unterminated string literal (missing closing quote)",
        ));
    }
    if depth > 0 {
        return Err(parse_error(end + 1, "unbalanced '(' in signature"));
    }

    if let Some(s) = start {
        let text = line[s..end].trim_end();
        if !text.is_empty() {
            out.push(Token { text, offset: s + 1 });
        }
    }

    Ok(out)
}

fn parse_slot_index(digits: &str) -> Result<u8, String> {
    let idx: usize = digits
        .parse()
        .map_err(|_| format!("invalid slot index '{digits}'"))?;
    if idx >= MAX_STATE_SLOTS {
        return Err(format!(
            "slot index {idx} exceeds the maximum of {}",
            MAX_STATE_SLOTS - 1
        ));
    }
    Ok(idx as u8)
}

/// Parse an argument reference like `s0`, `d3`, `state`.
fn parse_arg(text: &str) -> Result<Arg, String> {
    if text == "state" {
        return Ok(Arg::State);
    }
    if let Some(digits) = text.strip_prefix('s') {
        return parse_slot_index(digits).map(Arg::Static);
    }
    if let Some(digits) = text.strip_prefix('d') {
        return parse_slot_index(digits).map(Arg::Dynamic);
    }
    Err(format!("expected sN, dN or state, got '{text}'"))
}

/// Parse an output like `s0`, `d3`, `state`, `_`.
fn parse_output(text: &str) -> Result<Output, String> {
    match text {
        "_" => Ok(Output::Discard),
        "state" => Ok(Output::ReplaceState),
        _ => match parse_arg(text) {
            Ok(Arg::Static(i)) => Ok(Output::Static(i)),
            Ok(Arg::Dynamic(i)) => Ok(Output::Dynamic(i)),
            _ => Err(format!("expected sN, dN, state or _, got '{text}'")),
        },
    }
}

/// Parse `fallback`, a `0x` selector or a canonical signature.
fn parse_selector(text: &str) -> Result<Selector, String> {
    if text == "fallback" {
        return Ok(FALLBACK_SELECTOR);
    }
    if text.starts_with("0x") {
        let bytes = hex::decode(text).ok_or_else(|| format!("invalid selector '{text}'"))?;
        return bytes
            .try_into()
            .map_err(|_| format!("selector '{text}' must be 4 bytes"));
    }
    let signature: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    match signature.find('(') {
        Some(open) if open > 0 && signature.ends_with(')') => Ok(selector_of(&signature)),
        _ => Err(format!("expected signature like 'name(type,...)', got '{text}'")),
    }
}

/// Parse `@alias` or a `0x` address.
fn parse_target(ctx: &AsmContext, text: &str) -> Result<Address, String> {
    if let Some(name) = text.strip_prefix(ALIAS_PREFIX) {
        return ctx
            .resolve_alias(name)
            .ok_or_else(|| format!("unknown alias '@{name}'"));
    }
    text.parse()
}

/// Parse a decimal or `0x` hex integer into a word.
fn parse_u256(text: &str) -> Result<Word, String> {
    if text.starts_with("0x") {
        let bytes = hex::decode(text).ok_or_else(|| format!("invalid hex integer '{text}'"))?;
        if bytes.len() > WORD_LEN {
            return Err(format!("integer '{text}' does not fit in 256 bits"));
        }
        let mut word = Word::zero();
        word.0[WORD_LEN - bytes.len()..].copy_from_slice(&bytes);
        return Ok(word);
    }
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid integer '{text}'"));
    }
    let ten = Word::from_u64(10);
    text.bytes().try_fold(Word::zero(), |acc, digit| {
        acc.checked_mul(&ten)
            .and_then(|w| w.checked_add(&Word::from_u64(u64::from(digit - b'0'))))
            .ok_or_else(|| format!("integer '{text}' does not fit in 256 bits"))
    })
}

/// Parse a double-quoted string literal and resolve its escapes.
fn parse_string_literal(text: &str) -> Result<Vec<u8>, String> {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .filter(|_| text.len() >= 2)
        .ok_or_else(|| format!("expected a double-quoted string, got {text}"))?;

    let mut out = Vec::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => out.push(b'\n'),
            Some('t') => out.push(b'\t'),
            Some('r') => out.push(b'\r'),
            Some('0') => out.push(0),
            Some('\\') => out.push(b'\\'),
            Some('"') => out.push(b'"'),
            Some('x') => {
                let digits: String = chars.by_ref().take(2).collect();
                let byte = u8::from_str_radix(&digits, 16)
                    .map_err(|_| format!("invalid escape '\\x{digits}'"))?;
                out.push(byte);
            }
            Some(other) => return Err(format!("unknown escape '\\{other}'")),
            None => return Err("dangling '\\' at end of string".to_string()),
        }
    }
    Ok(out)
}

/// Parse the literal of a `slot <kind> <literal>` line.
fn parse_slot_literal(ctx: &AsmContext, kind: &str, literal: &str) -> Result<Vec<u8>, String> {
    match kind {
        "u256" => parse_u256(literal).map(|w| w.0.to_vec()),
        "word" => {
            let bytes = hex::decode(literal).ok_or_else(|| format!("invalid hex '{literal}'"))?;
            if bytes.len() != WORD_LEN {
                return Err(format!("word literal must be 32 bytes, got {}", bytes.len()));
            }
            Ok(bytes)
        }
        "addr" => parse_target(ctx, literal).map(|a| Word::from_address(a).0.to_vec()),
        "bool" => match literal {
            "true" => Ok(Word::from_bool(true).0.to_vec()),
            "false" => Ok(Word::from_bool(false).0.to_vec()),
            _ => Err(format!("expected true or false, got '{literal}'")),
        },
        "str" => parse_string_literal(literal),
        "bytes" => hex::decode(literal).ok_or_else(|| format!("invalid hex '{literal}'")),
        _ => Err(format!(
            "unknown slot kind '{kind}' (expected u256, word, addr, bool, str or bytes)"
        )),
    }
}

/// Parse the operands of a call line after its mnemonic.
fn parse_call(
    ctx: &AsmContext,
    line_no: usize,
    kind: CallKind,
    head: &Token<'_>,
    rest: &[Token<'_>],
) -> Result<Command, VMError> {
    let mut it = rest.iter();
    let target_tok = it
        .next()
        .ok_or_else(|| at(line_no, head, "missing call target"))?;
    let target = parse_target(ctx, target_tok.text).map_err(|r| at(line_no, target_tok, r))?;
    let selector_tok = it
        .next()
        .ok_or_else(|| at(line_no, target_tok, "missing function signature"))?;
    let selector = parse_selector(selector_tok.text).map_err(|r| at(line_no, selector_tok, r))?;

    let mut args = Vec::new();
    let mut output = None;
    let mut flags = 0u8;

    while let Some(tok) = it.next() {
        if let Some(inline) = tok.text.strip_prefix(ARROW) {
            if output.is_some() {
                return Err(at(line_no, tok, "output given twice"));
            }
            let out_tok = if inline.is_empty() {
                it.next()
                    .ok_or_else(|| at(line_no, tok, "expected an output after '->'"))?
                    .clone()
            } else {
                Token {
                    text: inline,
                    offset: tok.offset + ARROW.len(),
                }
            };
            output = Some(parse_output(out_tok.text).map_err(|r| at(line_no, &out_tok, r))?);
        } else if let Some(flag) = tok.text.strip_prefix(FLAG_PREFIX) {
            flags |= match flag {
                "tuple" => FLAG_TUPLE_RETURN,
                "stateinput" => FLAG_STATE_INPUT,
                "abitail" => FLAG_ABI_TAIL,
                _ => return Err(at(line_no, tok, format!("unknown flag '+{flag}'"))),
            };
        } else {
            if output.is_some() {
                return Err(at(line_no, tok, "arguments must come before '->'"));
            }
            if args.len() == MAX_ARGS {
                return Err(at(line_no, tok, format!("at most {MAX_ARGS} arguments")));
            }
            args.push(parse_arg(tok.text).map_err(|r| at(line_no, tok, r))?);
        }
    }

    if kind == CallKind::Value && !matches!(args.first(), Some(Arg::Static(_))) {
        return Err(at(
            line_no,
            head,
            "valuecall needs a static value slot as its first argument",
        ));
    }

    Ok(Command::new(kind, selector, target)
        .with_args(&args)
        .with_output(output.unwrap_or(Output::Discard))
        .with_flags(flags))
}

fn assemble(source: &str, mut ctx: AsmContext) -> Result<Script, VMError> {
    let mut script = Script::default();

    for (idx, line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let tokens = tokenize(line_no, line)?;
        let Some(first) = tokens.first() else {
            continue;
        };

        match first.text {
            "slot" => {
                let [_, kind, literal] = tokens.as_slice() else {
                    return Err(at(line_no, first, "expected 'slot <kind> <literal>'"));
                };
                if script.state.len() >= MAX_STATE_SLOTS {
                    return Err(at(
                        line_no,
                        first,
                        format!("more than {MAX_STATE_SLOTS} slots"),
                    ));
                }
                let value = parse_slot_literal(&ctx, kind.text, literal.text)
                    .map_err(|r| at(line_no, literal, r))?;
                script.state.push(value);
            }
            "alias" => {
                let [_, name, address] = tokens.as_slice() else {
                    return Err(at(line_no, first, "expected 'alias <name> <0xaddress>'"));
                };
                let addr: Address = address
                    .text
                    .parse()
                    .map_err(|r: String| at(line_no, address, r))?;
                ctx.define_alias(name.text, addr)
                    .map_err(|r| at(line_no, name, r))?;
            }
            mnemonic => {
                let kind = CallKind::from_mnemonic(mnemonic)
                    .ok_or_else(|| at(line_no, first, format!("unknown directive '{mnemonic}'")))?;
                let command = parse_call(&ctx, line_no, kind, first, &tokens[1..])?;
                script.commands.push(command.encode());
            }
        }
    }

    Ok(script)
}

/// Assembles `source` with no predefined aliases.
pub fn assemble_source(source: &str) -> Result<Script, VMError> {
    assemble_source_with(source, "<source>", AsmContext::new())
}

/// Assembles `source`, logging a diagnostic against `source_name` on failure.
pub fn assemble_source_with(
    source: &str,
    source_name: &str,
    ctx: AsmContext,
) -> Result<Script, VMError> {
    let result = assemble(source, ctx);
    if let Err(err) = &result {
        error!("{}", render_assembly_diagnostic(source_name, source, err));
    }
    result
}

/// Convenience: assemble directly from file path
pub fn assemble_file<P: AsRef<Path>>(path: P, ctx: AsmContext) -> Result<Script, VMError> {
    let path_ref = path.as_ref();
    let source = fs::read_to_string(path_ref).map_err(|e| VMError::IoError {
        path: path_ref.display().to_string(),
        reason: e.to_string(),
    })?;
    assemble_source_with(&source, &path_ref.display().to_string(), ctx)
}

/// Renders a script back to assembly text.
///
/// Targets known to `ctx` are printed as aliases. Slots holding exactly 32
/// bytes are printed as `word`, everything else as `bytes`.
pub fn disassemble(script: &Script, ctx: &AsmContext) -> Result<String, VMError> {
    let mut out = String::new();
    for slot in &script.state {
        let kind = if slot.len() == WORD_LEN { "word" } else { "bytes" };
        let _ = writeln!(out, "slot {kind} 0x{}", hex::encode(slot));
    }

    for command in script.decode_commands()? {
        let target = match ctx.alias_of(command.target) {
            Some(alias) => format!("{ALIAS_PREFIX}{alias}"),
            None => command.target.to_string(),
        };
        let selector = if command.is_fallback() {
            "fallback".to_string()
        } else {
            format!("0x{}", hex::encode(&command.selector))
        };
        let _ = write!(out, "{} {target} {selector}", command.call_kind());
        for arg in command.args() {
            let _ = write!(out, " {arg}");
        }
        if command.output() != Output::Discard {
            let _ = write!(out, " {ARROW} {}", command.output());
        }
        if command.tuple_return() {
            let _ = write!(out, " {FLAG_PREFIX}tuple");
        }
        if command.state_input() {
            let _ = write!(out, " {FLAG_PREFIX}stateinput");
        }
        if command.abi_tail() {
            let _ = write!(out, " {FLAG_PREFIX}abitail");
        }
        out.push('\n');
    }
    Ok(out)
}
