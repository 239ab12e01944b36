//! Fixed Python harness and script rendering.
//!
//! The harness connects to iTerm2, interprets the embedded step list under
//! a step budget, and prints exactly one JSON line: the result dictionary
//! on success, `{error, errorType, traceback}` on failure. It always exits
//! 0 once it has printed; a non-zero exit means the interpreter itself
//! broke (missing `iterm2` package, syntax error).
//!
//! Escaping happens in one place: the step list is JSON-encoded, and that
//! JSON text is encoded again as a JSON string literal, which is also a
//! valid Python string literal. Nothing else from the caller reaches the
//! script.

use std::time::Duration;

use crate::step::Step;

pub const HARNESS: &str = r#"import asyncio
import json
import sys
import traceback

import iterm2


class StepError(Exception):
    pass


def _emit(payload):
    sys.stdout.write(json.dumps(payload, default=str) + "\n")
    sys.stdout.flush()


def _failure(exc, error_type=None):
    return {
        "error": str(exc) or type(exc).__name__,
        "errorType": error_type or type(exc).__name__,
        "traceback": traceback.format_exc(),
    }


def _current(state):
    session = state.get("session")
    if session is None:
        raise StepError("No session selected")
    return session


def _find_session(app, session_id):
    for window in app.terminal_windows:
        for tab in window.tabs:
            for session in tab.sessions:
                if session.session_id == session_id:
                    return session
    raise StepError("Session not found: %s" % session_id)


async def _create_window(connection, step, state):
    window = await iterm2.Window.async_create(connection, profile=step.get("profile"))
    if window is None:
        raise StepError("Window creation returned no window")
    tab = window.current_tab
    session = tab.current_session
    state["session"] = session
    result = state["result"]
    result["window_id"] = window.window_id
    result["tab_id"] = tab.tab_id
    result["session_id"] = session.session_id
    try:
        frame = await window.async_get_frame()
        result["frame"] = {
            "x": frame.origin.x,
            "y": frame.origin.y,
            "width": frame.size.width,
            "height": frame.size.height,
        }
    except Exception:
        pass


async def _set_tab_color(step, state):
    color = iterm2.Color(
        round(step["red"] * 255),
        round(step["green"] * 255),
        round(step["blue"] * 255),
    )
    change = iterm2.LocalWriteOnlyProfile()
    change.set_tab_color(color)
    change.set_use_tab_color(True)
    await _current(state).async_set_profile_properties(change)


async def _prompt_state(connection, state):
    session = _current(state)
    prompt = await iterm2.async_get_last_prompt(connection, session.session_id)
    if prompt is None:
        return False
    editing = getattr(getattr(iterm2, "PromptState", None), "EDITING", None)
    if editing is None:
        return getattr(prompt, "command", None) is None
    return getattr(prompt, "state", None) == editing


def _listing(app):
    windows = []
    for window in app.terminal_windows:
        tabs = []
        for tab in window.tabs:
            sessions = [
                {"session_id": s.session_id, "name": s.name} for s in tab.sessions
            ]
            tabs.append({"tab_id": tab.tab_id, "sessions": sessions})
        windows.append({"window_id": window.window_id, "tabs": tabs})
    return windows


async def _run_steps(connection, app, steps, state):
    result = state["result"]
    for step in steps:
        op = step["op"]
        if op == "create_window":
            await _create_window(connection, step, state)
        elif op == "find_session":
            state["session"] = _find_session(app, step["session_id"])
        elif op == "split":
            session = _current(state)
            created = await session.async_split_pane(
                vertical=step["vertical"], profile=step.get("profile")
            )
            state["session"] = created
            result["new_session_id"] = created.session_id
        elif op == "send_text":
            await _current(state).async_send_text(step["text"])
        elif op == "set_tab_color":
            await _set_tab_color(step, state)
        elif op == "read_variable":
            result[step["key"]] = await _current(state).async_get_variable(step["name"])
        elif op == "read_prompt_state":
            result[step["key"]] = await _prompt_state(connection, state)
        elif op == "list_sessions":
            result["windows"] = _listing(app)
        elif op == "isolated":
            outcomes = result.setdefault("outcomes", {})
            saved = state.get("session")
            try:
                await _run_steps(connection, app, step["steps"], state)
                outcomes[step["key"]] = {"ok": True}
            except Exception as exc:
                outcomes[step["key"]] = {"ok": False, "error": str(exc) or type(exc).__name__}
            state["session"] = saved
        else:
            raise StepError("Unknown step: %s" % op)


async def _main(connection):
    try:
        app = await iterm2.async_get_app(connection)
        state = {"session": None, "result": {}}
        await asyncio.wait_for(_run_steps(connection, app, STEPS, state), STEP_TIMEOUT)
        _emit(state["result"])
    except (asyncio.TimeoutError, TimeoutError) as exc:
        payload = _failure(exc, "TimeoutError")
        payload["error"] = "Steps exceeded the %s second budget" % STEP_TIMEOUT
        _emit(payload)
    except Exception as exc:
        _emit(_failure(exc))


def run():
    try:
        iterm2.run_until_complete(_main, retry=False)
    except Exception as exc:
        _emit(_failure(exc, "ConnectionError"))
"#;

/// Render a complete, self-contained bridge script for `steps`.
pub fn render_script(steps: &[Step], step_timeout: Duration) -> Result<String, serde_json::Error> {
    let steps_json = serde_json::to_string(steps)?;
    let literal = serde_json::to_string(&steps_json)?;

    let mut script = String::with_capacity(HARNESS.len() + literal.len() + 96);
    script.push_str(HARNESS);
    script.push_str("\n\nSTEPS = json.loads(");
    script.push_str(&literal);
    script.push_str(")\n");
    script.push_str(&format!("STEP_TIMEOUT = {}\n", step_timeout.as_secs_f64()));
    script.push_str("\nrun()\n");
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps_line(script: &str) -> &str {
        script
            .lines()
            .find(|l| l.starts_with("STEPS = "))
            .expect("steps line present")
    }

    #[test]
    fn embeds_steps_as_json_string_literal() {
        let script = render_script(&[Step::find_session("abc")], Duration::from_secs(30))
            .expect("render");
        let line = steps_line(&script);
        let literal = line
            .strip_prefix("STEPS = json.loads(")
            .and_then(|l| l.strip_suffix(')'))
            .expect("wrapped in json.loads");
        let inner: String = serde_json::from_str(literal).expect("string literal");
        let steps: Vec<Step> = serde_json::from_str(&inner).expect("step list");
        assert_eq!(steps, vec![Step::find_session("abc")]);
    }

    #[test]
    fn hostile_text_stays_inside_the_literal() {
        let hostile = "\"); import os; os.system('rm -rf /') #\n'''\\";
        let script = render_script(&[Step::send_line(hostile)], Duration::from_secs(30))
            .expect("render");
        // The whole payload stays on one line and decodes back unchanged.
        let line = steps_line(&script);
        let literal = line
            .strip_prefix("STEPS = json.loads(")
            .and_then(|l| l.strip_suffix(')'))
            .expect("wrapped in json.loads");
        let inner: String = serde_json::from_str(literal).expect("string literal");
        let steps: Vec<Step> = serde_json::from_str(&inner).expect("step list");
        assert_eq!(steps, vec![Step::send_line(hostile)]);
    }

    #[test]
    fn step_timeout_and_entrypoint_follow_steps() {
        let script = render_script(&[], Duration::from_secs(30)).expect("render");
        assert!(script.contains("STEP_TIMEOUT = 30\n"));
        assert!(script.trim_end().ends_with("run()"));
        assert!(script.starts_with("import asyncio"));
    }
}
