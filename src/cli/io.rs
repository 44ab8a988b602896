//! Output handling for CLI
//!
//! Route listings go to stdout, either as an aligned table or as a single
//! JSON array. UTF-8 only.

use std::io::{self, Write};

use crate::rest_api::{RouteInfo, RouteSpec};

use super::errors::CliResult;

/// Write the route table to `out`
pub fn write_routes<W: Write>(out: &mut W, routes: &[RouteSpec], json: bool) -> CliResult<()> {
    if json {
        let rows: Vec<RouteInfo> = routes.iter().map(RouteInfo::from).collect();
        serde_json::to_writer(&mut *out, &rows)?;
        writeln!(out)?;
    } else {
        for route in routes {
            writeln!(out, "{}", route)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Write the route table to stdout
pub fn print_routes(routes: &[RouteSpec], json: bool) -> CliResult<()> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    write_routes(&mut lock, routes, json)
}
