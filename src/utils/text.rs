/// Utilitários de texto usados nos logs e na renderização da página

/// Prefixo seguro (limite de caractere UTF-8) com no máximo `max_bytes` bytes
pub fn truncate_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}

/// Mascara um segredo para log: mostra só os primeiros caracteres
///
/// # Exemplo
/// ```
/// use withings_sync_addon::utils::mask_secret;
///
/// assert_eq!(mask_secret("abcdef123456", 4), "abcd…");
/// assert_eq!(mask_secret("abc", 4), "…");
/// ```
pub fn mask_secret(secret: &str, visible: usize) -> String {
    // Segredos curtos não revelam nada
    if secret.len() <= visible {
        return "…".to_string();
    }
    format!("{}…", truncate_safe(secret, visible))
}

/// Escapa texto para interpolação em HTML (conteúdo e atributos)
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
