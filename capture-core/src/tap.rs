//! Components B & C: the generated fetch/XHR tap.
//!
//! A Rust process cannot redefine a page's `window.fetch` from the outside;
//! the only code that can is JavaScript running in the page's own realm.
//! This module generates that script, following the same injection-and-drain
//! shape the teacher uses for its event recorder (`FlowRecorder::
//! get_capture_script` / `get_drain_events_script`): one self-patching
//! script that buffers on a `window.__` global, guarded against
//! double-injection, plus a second script that atomically drains and clears
//! that buffer. `interceptor.rs` owns the Rust-side lifecycle around it.

use crate::config::TapConfig;

const INJECTED_FLAG: &str = "__harnessTapInjected";
const BUFFER: &str = "__harnessApiCalls";
const INFLIGHT: &str = "__harnessInFlight";
const ORIGINALS: &str = "__harnessOriginals";

/// Render the tap's `ignore_patterns` into a JS array literal of
/// `{literal, regex}` descriptors the injected matcher understands.
fn render_ignore_patterns(config: &TapConfig) -> String {
    let entries: Vec<String> = config
        .ignore_patterns
        .iter()
        .map(|p| {
            if let Some(inner) = p.strip_prefix('/').and_then(|s| s.strip_suffix('/')) {
                format!("{{\"regex\":{}}}", serde_json::to_string(inner).unwrap())
            } else {
                format!("{{\"literal\":{}}}", serde_json::to_string(p).unwrap())
            }
        })
        .collect();
    format!("[{}]", entries.join(","))
}

/// Build the injectable capture script for the current config. Idempotent:
/// running it twice in the same page is a no-op after the first injection,
/// matching the teacher's `window.__flowRecorderInjected` guard.
pub fn capture_script(config: &TapConfig) -> String {
    let patterns = render_ignore_patterns(config);
    let filter_expr = config.filter.clone().unwrap_or_else(|| "true".to_string());
    let max_body_size = config.max_body_size;
    let capture_request_body = config.capture_request_body;
    let capture_response_body = config.capture_response_body;
    let capture_headers = config.capture_headers;

    format!(
        r#"(function() {{
  if (window.{flag}) return;
  window.{flag} = true;
  window.{buffer} = window.{buffer} || [];
  window.{inflight} = window.{inflight} || new Map();
  window.{originals} = window.{originals} || {{
    fetch: window.fetch ? window.fetch.bind(window) : null,
    open: window.XMLHttpRequest ? window.XMLHttpRequest.prototype.open : null,
    send: window.XMLHttpRequest ? window.XMLHttpRequest.prototype.send : null,
    setRequestHeader: window.XMLHttpRequest ? window.XMLHttpRequest.prototype.setRequestHeader : null,
  }};

  var IGNORE_PATTERNS = {patterns};
  var MAX_BODY_SIZE = {max_body_size};
  var CAPTURE_REQUEST_BODY = {capture_request_body};
  var CAPTURE_RESPONSE_BODY = {capture_response_body};
  var CAPTURE_HEADERS = {capture_headers};

  function shouldCapture(url, method) {{
    for (var i = 0; i < IGNORE_PATTERNS.length; i++) {{
      var p = IGNORE_PATTERNS[i];
      if (p.literal !== undefined && url.indexOf(p.literal) !== -1) return false;
      if (p.regex !== undefined && new RegExp(p.regex).test(url)) return false;
    }}
    try {{
      return !!({filter_expr});
    }} catch (e) {{
      return true;
    }}
  }}

  function genId() {{
    if (window.crypto && window.crypto.randomUUID) return window.crypto.randomUUID();
    return 'id-' + Date.now() + '-' + Math.random().toString(16).slice(2);
  }}

  function headersToObject(h) {{
    var out = {{}};
    if (!h) return out;
    if (typeof h.forEach === 'function') {{
      h.forEach(function(v, k) {{ out[String(k).toLowerCase()] = v; }});
    }} else {{
      for (var k in h) {{ out[String(k).toLowerCase()] = h[k]; }}
    }}
    return out;
  }}

  function sizeOf(text) {{
    try {{ return new Blob([text]).size; }} catch (e) {{ return text ? text.length : 0; }}
  }}

  function normalizeBody(text, contentType) {{
    if (text === undefined || text === null) return undefined;
    var size = sizeOf(text);
    if (MAX_BODY_SIZE && size > MAX_BODY_SIZE) {{
      return '[Body too large: ' + size + ' bytes]';
    }}
    var trimmed = String(text).trim();
    var looksJson = (contentType && contentType.indexOf('application/json') !== -1) ||
      (trimmed[0] === '{{' && trimmed[trimmed.length - 1] === '}}') ||
      (trimmed[0] === '[' && trimmed[trimmed.length - 1] === ']');
    if (looksJson) {{
      try {{ return JSON.parse(trimmed); }} catch (e) {{ /* fall through */ }}
    }}
    return text;
  }}

  function extractRequestBody(input, init) {{
    if (!CAPTURE_REQUEST_BODY) return undefined;
    try {{
      var body = (init && init.body !== undefined) ? init.body : (input && input.body);
      if (body === undefined || body === null) return undefined;
      if (typeof ReadableStream !== 'undefined' && body instanceof ReadableStream) {{
        return '[ReadableStream - body not captured]';
      }}
      if (typeof FormData !== 'undefined' && body instanceof FormData) {{
        var out = [];
        body.forEach(function(value, name) {{
          if (typeof File !== 'undefined' && value instanceof File) {{
            out.push({{type: 'File', name: name, size: value.size, mimeType: value.type}});
          }} else {{
            out.push({{name: name, value: String(value)}});
          }}
        }});
        return out;
      }}
      if (typeof body === 'string') return normalizeBody(body, null);
      return undefined;
    }} catch (e) {{ return undefined; }}
  }}

  function finalizeEntry(entry) {{
    window.{inflight}.delete(entry.request.id);
    window.{buffer}.push(entry);
  }}

  function onRequest(entry) {{ /* hook point for facade callbacks, intentionally inert here */ }}

  if (window.{originals}.fetch) {{
    window.fetch = function(input, init) {{
      var url = typeof input === 'string' ? input : (input && input.url) || '';
      var method = (init && init.method) || (input && input.method) || 'GET';
      if (!shouldCapture(url, method)) {{
        return window.{originals}.fetch(input, init);
      }}
      var id = genId();
      var timestamp = Date.now();
      var headers = CAPTURE_HEADERS ? headersToObject((init && init.headers) || (input && input.headers)) : {{}};
      var requestBody = extractRequestBody(input, init);
      var entry = {{
        request: {{id: id, url: url, method: method, headers: headers, body: requestBody, timestamp: timestamp, initiator: 'fetch'}},
        response: null, error: null, pending: true,
      }};
      window.{inflight}.set(id, entry);
      onRequest(entry);
      return window.{originals}.fetch(input, init).then(function(response) {{
        var responseTime = Date.now() - timestamp;
        var respHeaders = CAPTURE_HEADERS ? headersToObject(response.headers) : {{}};
        var finish = function(bodyValue) {{
          entry.response = {{
            status: response.status, statusText: response.statusText,
            headers: respHeaders, body: bodyValue, responseTime: responseTime,
          }};
          entry.pending = false;
          finalizeEntry(entry);
        }};
        if (!CAPTURE_RESPONSE_BODY) {{ finish(undefined); return response; }}
        try {{
          var cloned = response.clone();
          cloned.text().then(function(text) {{
            finish(normalizeBody(text, respHeaders['content-type']));
          }}).catch(function() {{ finish(undefined); }});
        }} catch (e) {{ finish(undefined); }}
        return response;
      }}, function(err) {{
        var responseTime = Date.now() - timestamp;
        entry.error = err && err.message ? err.message : String(err);
        entry.response = {{status: 0, statusText: 'Network Error', headers: {{}}, responseTime: responseTime}};
        entry.pending = false;
        finalizeEntry(entry);
        throw err;
      }});
    }};
  }}

  if (window.{originals}.open && window.XMLHttpRequest) {{
    var proto = window.XMLHttpRequest.prototype;
    proto.open = function(method, url) {{
      this.__harnessMethod = method;
      this.__harnessUrl = url;
      this.__harnessHeaders = {{}};
      return window.{originals}.open.apply(this, arguments);
    }};
    proto.setRequestHeader = function(name, value) {{
      if (this.__harnessHeaders) this.__harnessHeaders[String(name).toLowerCase()] = value;
      return window.{originals}.setRequestHeader.apply(this, arguments);
    }};
    proto.send = function(body) {{
      var xhr = this;
      var url = this.__harnessUrl || '';
      var method = this.__harnessMethod || 'GET';
      if (!shouldCapture(url, method)) {{
        return window.{originals}.send.apply(this, arguments);
      }}
      var id = genId();
      var timestamp = Date.now();
      var entry = {{
        request: {{
          id: id, url: url, method: method,
          headers: CAPTURE_HEADERS ? (xhr.__harnessHeaders || {{}}) : {{}},
          body: CAPTURE_REQUEST_BODY ? normalizeBody(body, (xhr.__harnessHeaders || {{}})['content-type']) : undefined,
          timestamp: timestamp, initiator: 'xhr',
        }},
        response: null, error: null, pending: true,
      }};
      window.{inflight}.set(id, entry);
      onRequest(entry);
      function finish(errMessage) {{
        var responseTime = Date.now() - timestamp;
        if (errMessage) {{
          entry.error = errMessage;
          entry.response = {{status: 0, statusText: 'Network Error', headers: {{}}, responseTime: responseTime}};
        }} else {{
          var respHeadersRaw = xhr.getAllResponseHeaders ? xhr.getAllResponseHeaders() : '';
          var respHeaders = {{}};
          respHeadersRaw.split('\r\n').forEach(function(line) {{
            var idx = line.indexOf(':');
            if (idx > 0) respHeaders[line.slice(0, idx).trim().toLowerCase()] = line.slice(idx + 1).trim();
          }});
          entry.response = {{
            status: xhr.status, statusText: xhr.statusText, headers: respHeaders,
            body: CAPTURE_RESPONSE_BODY ? normalizeBody(xhr.responseText, respHeaders['content-type']) : undefined,
            responseTime: responseTime,
          }};
        }}
        entry.pending = false;
        finalizeEntry(entry);
      }}
      xhr.addEventListener('loadend', function() {{ if (entry.pending) finish(null); }});
      xhr.addEventListener('abort', function() {{ if (entry.pending) finish('XHR aborted'); }});
      xhr.addEventListener('error', function() {{ if (entry.pending) finish('XHR error'); }});
      xhr.addEventListener('timeout', function() {{ if (entry.pending) finish('XHR timeout'); }});
      return window.{originals}.send.apply(this, arguments);
    }};
  }}
}})();"#,
        flag = INJECTED_FLAG,
        buffer = BUFFER,
        inflight = INFLIGHT,
        originals = ORIGINALS,
        patterns = patterns,
        max_body_size = max_body_size,
        capture_request_body = capture_request_body,
        capture_response_body = capture_response_body,
        capture_headers = capture_headers,
        filter_expr = filter_expr,
    )
}

/// Drain and clear the completed-call buffer in one round trip, returning it
/// as a JSON array (deserialize into `Vec<CapturedApiCall>` on the Rust
/// side). Does not touch in-flight entries.
pub fn drain_script() -> String {
    format!(
        r#"(function() {{
  var out = window.{buffer} || [];
  window.{buffer} = [];
  return out;
}})();"#,
        buffer = BUFFER
    )
}

/// Snapshot the in-flight table without draining it (`getPendingCalls`).
pub fn pending_script() -> String {
    format!(
        r#"(function() {{
  var map = window.{inflight} || new Map();
  var out = [];
  map.forEach(function(entry) {{ out.push(entry); }});
  return out;
}})();"#,
        inflight = INFLIGHT
    )
}

/// Clear both the completed buffer and the in-flight table (`clear()`).
pub fn clear_script() -> String {
    format!(
        r#"(function() {{
  window.{buffer} = [];
  window.{inflight} = new Map();
}})();"#,
        buffer = BUFFER,
        inflight = INFLIGHT
    )
}

/// Restore the page's original `fetch`/`XMLHttpRequest` entry points and
/// clear the injected-flag so a future `start()` can re-patch cleanly.
pub fn uninstall_script() -> String {
    format!(
        r#"(function() {{
  if (!window.{originals}) return;
  if (window.{originals}.fetch) window.fetch = window.{originals}.fetch;
  if (window.XMLHttpRequest) {{
    if (window.{originals}.open) window.XMLHttpRequest.prototype.open = window.{originals}.open;
    if (window.{originals}.send) window.XMLHttpRequest.prototype.send = window.{originals}.send;
    if (window.{originals}.setRequestHeader) window.XMLHttpRequest.prototype.setRequestHeader = window.{originals}.setRequestHeader;
  }}
  window.{flag} = false;
}})();"#,
        originals = ORIGINALS,
        flag = INJECTED_FLAG,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_script_embeds_config() {
        let config = TapConfig::default().with_max_body_size(4096);
        let script = capture_script(&config);
        assert!(script.contains("MAX_BODY_SIZE = 4096"));
        assert!(script.contains(INJECTED_FLAG));
        assert!(script.contains("window.fetch"));
        assert!(script.contains("XMLHttpRequest"));
    }

    #[test]
    fn capture_script_renders_regex_and_literal_patterns() {
        let config = TapConfig::default()
            .with_ignore_patterns(vec!["literal.example.com".to_string(), "/^chrome-ext/".to_string()]);
        let script = capture_script(&config);
        assert!(script.contains("\"literal\":\"literal.example.com\""));
        assert!(script.contains("\"regex\":\"^chrome-ext\""));
    }

    #[test]
    fn drain_and_clear_scripts_reference_the_same_buffer_names() {
        assert!(drain_script().contains(BUFFER));
        assert!(clear_script().contains(BUFFER));
        assert!(clear_script().contains(INFLIGHT));
        assert!(pending_script().contains(INFLIGHT));
    }

    #[test]
    fn uninstall_script_restores_originals_and_resets_flag() {
        let script = uninstall_script();
        assert!(script.contains(ORIGINALS));
        assert!(script.contains(INJECTED_FLAG));
    }
}
