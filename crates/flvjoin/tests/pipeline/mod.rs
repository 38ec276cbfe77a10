use std::path::PathBuf;

use flvjoin::{JoinError, Joiner, ProgressMode};

use crate::common::*;

struct Fixture {
    tools: tempfile::TempDir,
    inputs: tempfile::TempDir,
    output: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        init_test_tracing();
        Self {
            tools: tempfile::tempdir().unwrap(),
            inputs: tempfile::tempdir().unwrap(),
            output: tempfile::tempdir().unwrap(),
        }
    }

    fn joiner<I>(&self, fragments: I, yamdi: &str, ffmpeg: &str) -> Joiner
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.joiner_to(self.output.path().join("joined.flv"), fragments, yamdi, ffmpeg)
    }

    fn joiner_to<I>(&self, output: PathBuf, fragments: I, yamdi: &str, ffmpeg: &str) -> Joiner
    where
        I: IntoIterator<Item = PathBuf>,
    {
        Joiner::new(fragments)
            .output(output)
            .repair_tool(script_tool(self.tools.path(), "yamdi", yamdi))
            .concat_tool(script_tool(self.tools.path(), "ffmpeg", ffmpeg))
            .progress(ProgressMode::Hidden)
    }

    fn ffmpeg_called(&self) -> bool {
        self.tools.path().join("ffmpeg.called").exists()
    }
}

#[tokio::test]
async fn test_join_in_input_order() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let second = write_fragment(fixture.inputs.path(), "stream-002.flv", b"second;");
    let first = write_fragment(fixture.inputs.path(), "stream-001.flv", b"first;");

    let output = fixture
        .joiner([second, first], YAMDI, &ffmpeg())
        .run()
        .await?;

    assert_eq!(output, fixture.output.path().join("joined.flv"));
    assert_eq!(std::fs::read(&output)?, b"second;first;");

    let manifest = std::fs::read_to_string(fixture.tools.path().join("manifest.txt"))?;
    let lines: Vec<&str> = manifest.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("file '") && lines[0].ends_with("/000000_stream-002.flv'"));
    assert!(lines[1].starts_with("file '") && lines[1].ends_with("/000001_stream-001.flv'"));

    // the workspace is gone, only the published file is left
    assert_eq!(entries(fixture.output.path()), vec!["joined.flv"]);
    Ok(())
}

#[tokio::test]
async fn test_same_file_names() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let day1 = write_fragment(fixture.inputs.path(), "day1/part.flv", b"one;");
    let day2 = write_fragment(fixture.inputs.path(), "day2/part.flv", b"two;");

    let output = fixture
        .joiner([day1, day2], YAMDI, &ffmpeg_silent())
        .run()
        .await?;

    assert_eq!(std::fs::read(output)?, b"one;two;");
    Ok(())
}

#[tokio::test]
async fn test_quoted_file_name() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let fragment = write_fragment(fixture.inputs.path(), "it's live.flv", b"quoted;");

    let output = fixture
        .joiner([fragment], YAMDI, &ffmpeg())
        .run()
        .await?;

    assert_eq!(std::fs::read(output)?, b"quoted;");
    let manifest = std::fs::read_to_string(fixture.tools.path().join("manifest.txt"))?;
    assert!(manifest.trim_end().ends_with("/000000_its live.flv'"));
    Ok(())
}

#[tokio::test]
async fn test_quote_in_output_directory() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let streams = fixture.output.path().join("Bob's streams");
    std::fs::create_dir(&streams)?;
    let first = write_fragment(fixture.inputs.path(), "a.flv", b"first;");
    let second = write_fragment(fixture.inputs.path(), "b.flv", b"second;");

    let output = fixture
        .joiner_to(streams.join("joined.flv"), [first, second], YAMDI, &ffmpeg())
        .run()
        .await?;

    assert_eq!(std::fs::read(&output)?, b"first;second;");
    let manifest = std::fs::read_to_string(fixture.tools.path().join("manifest.txt"))?;
    for line in manifest.lines() {
        assert!(line.contains(r"/Bob'\''s streams/"), "{line}");
        // every quote is either one of the delimiters or part of an escape
        let unescaped = line.replace(r"'\''", "");
        assert_eq!(unescaped.matches('\'').count(), 2, "{line}");
    }
    assert_eq!(entries(&streams), vec!["joined.flv"]);
    Ok(())
}

#[tokio::test]
async fn test_output_named_like_repaired_fragment() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let first = write_fragment(fixture.inputs.path(), "a.flv", b"first;");
    let second = write_fragment(fixture.inputs.path(), "b.flv", b"second;");

    let output = fixture
        .joiner_to(
            fixture.output.path().join("000000_a.flv"),
            [first, second],
            YAMDI,
            &ffmpeg(),
        )
        .run()
        .await?;

    assert_eq!(std::fs::read(&output)?, b"first;second;");
    assert_eq!(entries(fixture.output.path()), vec!["000000_a.flv"]);
    Ok(())
}

#[tokio::test]
async fn test_repair_failure_aborts() {
    let fixture = Fixture::new();
    let good = write_fragment(fixture.inputs.path(), "good.flv", b"good;");
    let bad = write_fragment(fixture.inputs.path(), "bad.flv", b"bad;");

    let result = fixture
        .joiner([good, bad], YAMDI_REJECT_BAD, &ffmpeg())
        .run()
        .await;

    let Err(error) = result else {
        panic!("join should fail");
    };
    assert!(matches!(error, JoinError::ExternalTool { .. }));
    assert!(error.tool_output().unwrap().contains("broken FLV header"));

    assert!(!fixture.ffmpeg_called());
    assert!(entries(fixture.output.path()).is_empty());
}

#[tokio::test]
async fn test_concat_failure_publishes_nothing() {
    let fixture = Fixture::new();
    let fragment = write_fragment(fixture.inputs.path(), "a.flv", b"a;");

    let result = fixture
        .joiner([fragment], YAMDI, &ffmpeg_failing())
        .run()
        .await;

    let Err(error) = result else {
        panic!("join should fail");
    };
    assert!(matches!(error, JoinError::ExternalTool { .. }));
    assert!(error
        .tool_output()
        .unwrap()
        .contains("Invalid data found when processing input"));

    assert!(fixture.ffmpeg_called());
    assert!(entries(fixture.output.path()).is_empty());
}

#[tokio::test]
async fn test_missing_tool() {
    let fixture = Fixture::new();
    let fragment = write_fragment(fixture.inputs.path(), "a.flv", b"a;");

    let result = Joiner::new([fragment])
        .output(fixture.output.path().join("joined.flv"))
        .repair_tool(flvjoin::ExternalTool::new("/nonexistent/yamdi"))
        .concat_tool(script_tool(fixture.tools.path(), "ffmpeg", &ffmpeg()))
        .progress(ProgressMode::Hidden)
        .run()
        .await;

    assert!(matches!(result, Err(JoinError::Spawn { .. })));
    assert!(entries(fixture.output.path()).is_empty());
}

#[tokio::test]
async fn test_no_inputs_creates_nothing() {
    let fixture = Fixture::new();
    let result = fixture
        .joiner(Vec::new(), YAMDI, &ffmpeg())
        .workspace_root(fixture.output.path().to_path_buf())
        .run()
        .await;

    assert!(matches!(result, Err(JoinError::NoInputs)));
    assert!(entries(fixture.output.path()).is_empty());
}
