//! Community guide tool handlers.

use super::text_result;
use crate::Result;
use crate::mcp::tool_types::{
    FetchGuideArgs, MAX_GUIDE_ID_LENGTH, MAX_QUERY_LENGTH, SearchGuidesArgs, parse_args,
    validate_input_length,
};
use crate::mcp::tools::ToolResult;
use crate::steam::{SteamClient, format_guide_content, format_guide_search};
use serde_json::Value;

/// Executes the guide search tool.
pub fn execute_search_guides(client: &SteamClient, arguments: Value) -> Result<ToolResult> {
    let args: SearchGuidesArgs = parse_args(arguments)?;
    validate_input_length(&args.query, "query", MAX_QUERY_LENGTH)?;

    let guides = client.search_guides(args.app_id, &args.query)?;
    Ok(text_result(format_guide_search(
        args.app_id,
        &args.query,
        &guides,
    )))
}

/// Executes the guide content tool.
pub fn execute_fetch_guide(client: &SteamClient, arguments: Value) -> Result<ToolResult> {
    let args: FetchGuideArgs = parse_args(arguments)?;
    let guide_id = args.guide_id.into_string();
    validate_input_length(&guide_id, "guide_id", MAX_GUIDE_ID_LENGTH)?;
    if let Some(query) = &args.query {
        validate_input_length(query, "query", MAX_QUERY_LENGTH)?;
    }

    let content = client.fetch_guide(&guide_id, args.query.as_deref())?;
    Ok(text_result(format_guide_content(guide_id.trim(), &content)))
}
