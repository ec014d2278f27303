//! daml-viewer MCP - DAML access-control table generation over stdio

use daml_viewer_mcp::DamlViewerMcpServer;

mcp_common::serve_stdio!(DamlViewerMcpServer, "daml_viewer_mcp", "DAML_VIEWER_LOG_LEVEL");
