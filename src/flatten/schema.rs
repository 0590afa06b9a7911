/// Output columns, in export order.
pub const COLUMNS: [&str; 23] = [
    "buildId",
    "clientDate",
    "committers",
    "changeCount",
    "comment",
    "triggeredBy",
    "description",
    "isDefaultBranch",
    "branchName",
    "changes",
    "reasons",
    "testCount",
    "testRunId",
    "testNameId",
    "stacktrace",
    "className",
    "testMethod",
    "testClass",
    "testSuite",
    "duration",
    "orderId",
    "isFixed",
    "previousResponsible",
];

/// Key of the nested test list inside a build record.
pub const TESTS_FIELD: &str = "tests";

/// A test record is only exported when it carries this key.
pub const ELIGIBILITY_FIELD: &str = "previousResponsible";
