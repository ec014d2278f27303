//! Dharma MCP - grammar-based fuzzing test case generation over stdio

use dharma_mcp::DharmaMcpServer;

mcp_common::serve_stdio!(DharmaMcpServer, "dharma_mcp", "DHARMA_LOG_LEVEL");
