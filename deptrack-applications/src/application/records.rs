//! Guarded record operations
//!
//! Employees and finance rows are keyed by the department of the role the
//! session is operating in.

use super::DeptrackApplication;
use crate::auth::{Role, RoleRequirement, SessionContext};
use crate::records::{
    Employee, EmployeeForm, FinanceLedger, FinanceQuery, FinanceTransaction, Student,
    StudentForm, TransactionForm, TypeFilter,
};
use crate::{ApplicationError, ApplicationResult};

const TVET: RoleRequirement = RoleRequirement::One(Role::Tvet);

impl DeptrackApplication {
    /// Department tag of the operational role the session is in
    async fn operational_department(
        &self,
        ctx: &SessionContext,
    ) -> ApplicationResult<&'static str> {
        let authorized = self
            .require_role(ctx, &RoleRequirement::OPERATIONAL)
            .await?;
        Ok(authorized.role.department_tag())
    }

    // Personnel

    pub async fn list_employees(
        &self,
        ctx: &SessionContext,
        search: Option<&str>,
    ) -> ApplicationResult<Vec<Employee>> {
        let department = self.operational_department(ctx).await?;
        self.records.employees.list(department, search).await
    }

    pub async fn get_employee(&self, ctx: &SessionContext, id: i64) -> ApplicationResult<Employee> {
        let department = self.operational_department(ctx).await?;
        self.records.employees
            .get(department, id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Employee not found"))
    }

    pub async fn create_employee(
        &self,
        ctx: &SessionContext,
        form: EmployeeForm,
    ) -> ApplicationResult<Employee> {
        let department = self.operational_department(ctx).await?;
        self.records.employees.insert(department, &form.validated()?).await
    }

    pub async fn update_employee(
        &self,
        ctx: &SessionContext,
        id: i64,
        form: EmployeeForm,
    ) -> ApplicationResult<Employee> {
        let department = self.operational_department(ctx).await?;
        let form = form.validated()?;
        self.records.employees
            .update(department, id, &form)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Employee not found"))
    }

    pub async fn delete_employee(&self, ctx: &SessionContext, id: i64) -> ApplicationResult<()> {
        let department = self.operational_department(ctx).await?;
        if !self.records.employees.delete(department, id).await? {
            return Err(ApplicationError::not_found("Employee not found"));
        }
        Ok(())
    }

    // Students

    pub async fn list_students(
        &self,
        ctx: &SessionContext,
        search: Option<&str>,
    ) -> ApplicationResult<Vec<Student>> {
        self.require_role(ctx, &TVET).await?;
        self.records.students.list(search).await
    }

    pub async fn get_student(&self, ctx: &SessionContext, id: i64) -> ApplicationResult<Student> {
        self.require_role(ctx, &TVET).await?;
        self.records.students
            .get(id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Student not found"))
    }

    pub async fn create_student(
        &self,
        ctx: &SessionContext,
        form: StudentForm,
    ) -> ApplicationResult<Student> {
        self.require_role(ctx, &TVET).await?;
        self.records.students.insert(&form.validated()?).await
    }

    pub async fn update_student(
        &self,
        ctx: &SessionContext,
        id: i64,
        form: StudentForm,
    ) -> ApplicationResult<Student> {
        self.require_role(ctx, &TVET).await?;
        let fields = form.validated()?;
        self.records.students
            .update(id, &fields)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Student not found"))
    }

    pub async fn delete_student(&self, ctx: &SessionContext, id: i64) -> ApplicationResult<()> {
        self.require_role(ctx, &TVET).await?;
        if !self.records.students.delete(id).await? {
            return Err(ApplicationError::not_found("Student not found"));
        }
        Ok(())
    }

    // Finance

    /// Filtered transactions plus totals over the whole department
    pub async fn finance_ledger(
        &self,
        ctx: &SessionContext,
        query: &FinanceQuery,
    ) -> ApplicationResult<FinanceLedger> {
        let department = self.operational_department(ctx).await?;
        let search = query.search.as_deref();
        let transactions = match query.type_filter() {
            TypeFilter::Any => self.records.finance.list(department, None, search).await?,
            TypeFilter::Only(kind) => {
                self.records.finance.list(department, Some(kind), search).await?
            }
            TypeFilter::Unmatched => Vec::new(),
        };
        let totals = self.records.finance.totals(department).await?;

        Ok(FinanceLedger {
            transactions,
            totals,
        })
    }

    pub async fn create_transaction(
        &self,
        ctx: &SessionContext,
        form: TransactionForm,
    ) -> ApplicationResult<FinanceTransaction> {
        let department = self.operational_department(ctx).await?;
        self.records.finance.insert(department, &form.validated()?).await
    }

    pub async fn update_transaction(
        &self,
        ctx: &SessionContext,
        id: i64,
        form: TransactionForm,
    ) -> ApplicationResult<FinanceTransaction> {
        let department = self.operational_department(ctx).await?;
        if self.records.finance.get(department, id).await?.is_none() {
            return Err(ApplicationError::not_found("Transaction not found"));
        }
        let fields = form.validated()?;
        self.records.finance
            .update(department, id, &fields)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Transaction not found"))
    }

    pub async fn delete_transaction(&self, ctx: &SessionContext, id: i64) -> ApplicationResult<()> {
        let department = self.operational_department(ctx).await?;
        if !self.records.finance.delete(department, id).await? {
            return Err(ApplicationError::not_found("Transaction not found"));
        }
        Ok(())
    }
}
