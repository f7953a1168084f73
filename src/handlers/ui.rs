//! Página principal do add-on
//!
//! HTML renderizado no servidor com o estado das duas contas, formulários de
//! credenciais e o log da sincronização (atualizado via `/status`).

use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    response::Html,
};

use crate::utils::escape_html;
use crate::utils::logging::*;
use crate::AppState;

/// Dados que a página precisa; separado do handler para testes
#[derive(Debug, Clone)]
pub struct IndexPage {
    pub ingress_path: String,
    pub withings_auth_url: String,
    pub withings_authenticated: bool,
    pub garmin_authenticated: bool,
    pub sync_running: bool,
}

/// GET /
pub async fn index_page(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Html<String> {
    log_request_received("/", "GET");

    // Atrás do ingress, todas as URLs da página precisam do prefixo injetado pelo proxy
    let ingress_path = headers
        .get(state.settings.auth.proxy_header.as_str())
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .trim_end_matches('/')
        .to_string();

    let page = IndexPage {
        ingress_path,
        withings_auth_url: state.withings_oauth.authorization_url(),
        withings_authenticated: state.credentials.is_withings_authenticated(),
        garmin_authenticated: state.credentials.is_garmin_authenticated(),
        sync_running: state.runner.is_running().await,
    };

    Html(render_index(&page))
}

fn status_badge(authenticated: bool) -> &'static str {
    if authenticated {
        r#"<span class="badge ok">✅ Connected</span>"#
    } else {
        r#"<span class="badge missing">⚠️ Not connected</span>"#
    }
}

pub fn render_index(page: &IndexPage) -> String {
    let base = escape_html(&page.ingress_path);
    let auth_url = escape_html(&page.withings_auth_url);
    let sync_disabled = if page.sync_running { "disabled" } else { "" };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Withings Sync</title>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Arial, sans-serif;
               max-width: 800px; margin: 30px auto; padding: 20px; background: #f5f5f5; }}
        .card {{ background: white; padding: 24px; border-radius: 12px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); margin-bottom: 20px; }}
        .badge {{ padding: 4px 10px; border-radius: 12px; font-size: 13px; }}
        .badge.ok {{ background: #d4edda; color: #155724; }}
        .badge.missing {{ background: #fff3cd; color: #856404; }}
        input {{ width: 100%; padding: 10px; margin: 6px 0 12px; border: 1px solid #ddd; border-radius: 4px; box-sizing: border-box; }}
        button {{ background: #007bff; color: white; padding: 10px 20px; border: none;
                 border-radius: 6px; cursor: pointer; font-size: 14px; font-weight: bold; }}
        button:disabled {{ background: #999; cursor: default; }}
        button.danger {{ background: #dc3545; }}
        pre {{ background: #1e1e1e; color: #d4d4d4; padding: 16px; border-radius: 8px;
              max-height: 400px; overflow-y: auto; font-size: 12px; white-space: pre-wrap; }}
        h2 {{ margin-top: 0; color: #333; }}
        #message {{ margin: 10px 0; font-weight: bold; }}
    </style>
</head>
<body data-base="{base}">
    <div class="card">
        <h2>Withings {withings_badge}</h2>
        <p>1. <a href="{auth_url}" target="_blank" rel="noopener">Authorize Withings</a> and copy the code shown after login.</p>
        <form id="authorize-form">
            <input name="code" placeholder="Authorization code" autocomplete="off">
            <button type="submit">Save code</button>
        </form>
    </div>

    <div class="card">
        <h2>Garmin Connect {garmin_badge}</h2>
        <form id="garmin-form">
            <input name="email" type="email" placeholder="Email" autocomplete="username">
            <input name="password" type="password" placeholder="Password" autocomplete="current-password">
            <button type="submit">Save credentials</button>
        </form>
    </div>

    <div class="card">
        <h2>Sync</h2>
        <button id="sync-btn" onclick="startSync()" {sync_disabled}>🔄 Sync Now</button>
        <button class="danger" onclick="clearCredentials()">🗑️ Clear credentials</button>
        <div id="message"></div>
        <pre id="log"></pre>
    </div>

    <script>
        const base = document.body.dataset.base;
        let polling = null;

        function showMessage(data) {{
            const el = document.getElementById('message');
            el.textContent = data.message || '';
            el.style.color = data.success ? '#28a745' : '#dc3545';
        }}

        async function postForm(path, form) {{
            const res = await fetch(base + path, {{ method: 'POST', body: new URLSearchParams(new FormData(form)) }});
            return res.json();
        }}

        document.getElementById('authorize-form').addEventListener('submit', async (e) => {{
            e.preventDefault();
            showMessage(await postForm('/authorize', e.target));
        }});

        document.getElementById('garmin-form').addEventListener('submit', async (e) => {{
            e.preventDefault();
            const data = await postForm('/garmin', e.target);
            showMessage(data);
            if (data.success) {{ e.target.reset(); refreshStatus(); }}
        }});

        async function refreshStatus() {{
            const res = await fetch(base + '/status');
            const data = await res.json();
            const log = document.getElementById('log');
            log.textContent = (data.sync_log || []).join('\n');
            log.scrollTop = log.scrollHeight;
            document.getElementById('sync-btn').disabled = data.sync_running;
            if (!data.sync_running && polling) {{
                clearInterval(polling);
                polling = null;
                if (data.last_result) {{
                    showMessage({{ success: data.last_result.success,
                                   message: data.last_result.success ? 'Sync completed' : 'Sync failed' }});
                }}
            }}
        }}

        async function startSync() {{
            const res = await fetch(base + '/sync?async=1', {{ method: 'POST' }});
            const data = await res.json();
            showMessage(data);
            if (data.success && !polling) {{
                polling = setInterval(refreshStatus, 1000);
            }}
            refreshStatus();
        }}

        async function clearCredentials() {{
            if (!confirm('Remove all stored credentials?')) return;
            const res = await fetch(base + '/clear', {{ method: 'POST' }});
            showMessage(await res.json());
        }}

        refreshStatus();
        if (document.getElementById('sync-btn').disabled) {{
            polling = setInterval(refreshStatus, 1000);
        }}
    </script>
</body>
</html>
"#,
        base = base,
        auth_url = auth_url,
        withings_badge = status_badge(page.withings_authenticated),
        garmin_badge = status_badge(page.garmin_authenticated),
        sync_disabled = sync_disabled,
    )
}
