//! # 反向代理规则生成
//!
//! 为边界主机生成 nginx 站点配置：公开路径直连指标服务，其余路径全部经过网关，
//! 指标服务自身的端口不对外监听。

use std::fmt::Write as _;

use crate::config::AppConfig;

const GATEKEEPER_UPSTREAM: &str = "metrics_gatekeeper";
const METRICS_UPSTREAM: &str = "metrics_service";

fn push_proxy_block(out: &mut String, location: &str, upstream: &str) {
    let _ = writeln!(out, "    location {location} {{");
    let _ = writeln!(out, "        proxy_pass http://{upstream};");
    out.push_str("        proxy_http_version 1.1;\n");
    out.push_str("        proxy_set_header Host $host;\n");
    out.push_str("        proxy_set_header X-Real-IP $remote_addr;\n");
    out.push_str("        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;\n");
    out.push_str("        proxy_set_header X-Forwarded-Proto $scheme;\n");
    out.push_str("        proxy_read_timeout 10s;\n");
    out.push_str("    }\n\n");
}

/// 渲染 nginx 站点配置
#[must_use]
pub fn render_nginx_rules(config: &AppConfig) -> String {
    let gate = &config.gatekeeper;
    let mut out = String::new();

    out.push_str("# Generated by `gatekeeper rules`. Regenerate instead of editing.\n");
    let _ = writeln!(
        out,
        "# The metrics service at {} must only listen on loopback.\n",
        gate.upstream_addr
    );

    let _ = writeln!(out, "upstream {GATEKEEPER_UPSTREAM} {{");
    let _ = writeln!(out, "    server {};", gate.listen);
    out.push_str("}\n\n");

    let _ = writeln!(out, "upstream {METRICS_UPSTREAM} {{");
    let _ = writeln!(out, "    server {};", gate.upstream_addr);
    out.push_str("}\n\n");

    out.push_str("server {\n");
    let _ = writeln!(out, "    listen {};", gate.public_port);
    let _ = writeln!(out, "    server_name {};\n", gate.server_name);

    for path in &gate.public_paths {
        push_proxy_block(&mut out, &format!("= {path}"), METRICS_UPSTREAM);
    }
    push_proxy_block(&mut out, "/", GATEKEEPER_UPSTREAM);

    // 去掉最后一个空行
    if out.ends_with("\n\n") {
        out.pop();
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_paths_bypass_and_everything_else_goes_through_gatekeeper() {
        let config = AppConfig::default();
        let rules = render_nginx_rules(&config);

        assert!(rules.contains("listen 8080;"));
        assert!(rules.contains("location = /health {\n        proxy_pass http://metrics_service;"));
        assert!(rules.contains("location / {\n        proxy_pass http://metrics_gatekeeper;"));
        assert!(rules.contains("server 127.0.0.1:9100;"));
        assert!(!rules.contains("listen 9000"));
        assert!(rules.ends_with("}\n"));
    }

    #[test]
    fn every_configured_public_path_gets_an_exact_location() {
        let mut config = AppConfig::default();
        config.gatekeeper.public_paths = vec!["/health".into(), "/version".into()];
        config.gatekeeper.server_name = "metrics.example.com".into();

        let rules = render_nginx_rules(&config);
        assert!(rules.contains("location = /version {"));
        assert!(rules.contains("server_name metrics.example.com;"));
        assert_eq!(rules.matches("proxy_pass http://metrics_gatekeeper;").count(), 1);
    }
}
