//! The latency file (spec §6): `opcode cycles` pairs.

use crate::error::{err, Location, ParseResult};
use crate::lex::preprocess;
use rustc_hash::FxHashMap;

pub fn parse_latency_file(text: &str) -> ParseResult<FxHashMap<String, u32>> {
    let mut table = FxHashMap::default();
    for (ln, content) in preprocess(text) {
        let loc = Location::new(ln);
        let mut it = content.split_whitespace();
        let Some(opcode) = it.next() else {
            return err!(loc, "empty latency line");
        };
        let Some(cycles_tok) = it.next() else {
            return err!(loc, "latency line for `{}` is missing a cycle count", opcode);
        };
        let cycles: u32 = cycles_tok
            .parse()
            .map_err(|_| crate::error::ParseError { location: loc, message: format!("`{}` is not a positive integer", cycles_tok) })?;
        if cycles == 0 {
            return err!(loc, "latency for `{}` must be a positive integer", opcode);
        }
        table.insert(opcode.to_string(), cycles);
    }
    Ok(table)
}
