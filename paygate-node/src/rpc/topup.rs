use std::sync::Arc;

use tonic::{Request, Response, Status};

use paygate_common::model;
use paygate_common::requests::{CreateTopupRequest, UpdateTopupRequest};
use paygate_services::{LedgerQueryService, LedgerStatsService, TopupCommandService};

use super::convert;
use super::pb;
use super::pb::topup_command_server::TopupCommand;
use super::pb::topup_query_server::TopupQuery;
use super::pb::topup_stats_server::TopupStats;

pub struct TopupQueryRpc {
    service: Arc<LedgerQueryService<model::Topup>>,
}

impl TopupQueryRpc {
    pub fn new(service: Arc<LedgerQueryService<model::Topup>>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl TopupQuery for TopupQueryRpc {
    async fn find_all(
        &self,
        request: Request<pb::Pagination>,
    ) -> Result<Response<pb::TopupListReply>, Status> {
        let filter = convert::pagination(Some(request.into_inner()));
        let page = self.service.find_all(filter).await?;
        Ok(Response::new(convert::topup_list(page)))
    }

    async fn find_all_by_card_number(
        &self,
        request: Request<pb::CardNumberPageRequest>,
    ) -> Result<Response<pb::TopupListReply>, Status> {
        let req = request.into_inner();
        let filter = convert::pagination(req.filter);
        let page = self
            .service
            .find_all_by_card_number(req.card_number, filter)
            .await?;
        Ok(Response::new(convert::topup_list(page)))
    }

    async fn find_by_id(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::TopupReply>, Status> {
        let row = self.service.find_by_id(request.into_inner().id).await?;
        Ok(Response::new(pb::TopupReply {
            topup: Some(convert::topup(&row)),
        }))
    }

    async fn find_by_active(
        &self,
        request: Request<pb::Pagination>,
    ) -> Result<Response<pb::TopupListReply>, Status> {
        let filter = convert::pagination(Some(request.into_inner()));
        let page = self.service.find_by_active(filter).await?;
        Ok(Response::new(convert::topup_list(page)))
    }

    async fn find_by_trashed(
        &self,
        request: Request<pb::Pagination>,
    ) -> Result<Response<pb::TopupListReply>, Status> {
        let filter = convert::pagination(Some(request.into_inner()));
        let page = self.service.find_by_trashed(filter).await?;
        Ok(Response::new(convert::topup_list(page)))
    }
}

pub struct TopupCommandRpc {
    service: Arc<TopupCommandService>,
}

impl TopupCommandRpc {
    pub fn new(service: Arc<TopupCommandService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl TopupCommand for TopupCommandRpc {
    async fn create(
        &self,
        request: Request<pb::CreateTopupRequest>,
    ) -> Result<Response<pb::TopupReply>, Status> {
        let req = request.into_inner();
        let row = self
            .service
            .create(CreateTopupRequest {
                card_number: req.card_number,
                topup_amount: req.topup_amount,
                topup_method: req.topup_method,
            })
            .await?;
        Ok(Response::new(pb::TopupReply {
            topup: Some(convert::topup(&row)),
        }))
    }

    async fn update(
        &self,
        request: Request<pb::UpdateTopupRequest>,
    ) -> Result<Response<pb::TopupReply>, Status> {
        let req = request.into_inner();
        let row = self
            .service
            .update(UpdateTopupRequest {
                id: req.id,
                card_number: req.card_number,
                topup_amount: req.topup_amount,
                topup_method: req.topup_method,
            })
            .await?;
        Ok(Response::new(pb::TopupReply {
            topup: Some(convert::topup(&row)),
        }))
    }

    async fn trashed(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::TopupReply>, Status> {
        let row = self.service.trashed(request.into_inner().id).await?;
        Ok(Response::new(pb::TopupReply {
            topup: Some(convert::topup(&row)),
        }))
    }

    async fn restore(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::TopupReply>, Status> {
        let row = self.service.restore(request.into_inner().id).await?;
        Ok(Response::new(pb::TopupReply {
            topup: Some(convert::topup(&row)),
        }))
    }

    async fn delete_permanent(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::Empty>, Status> {
        self.service.delete_permanent(request.into_inner().id).await?;
        Ok(Response::new(pb::Empty {}))
    }

    async fn restore_all(
        &self,
        _request: Request<pb::Empty>,
    ) -> Result<Response<pb::AffectedReply>, Status> {
        let affected = self.service.restore_all().await?;
        Ok(Response::new(pb::AffectedReply { affected }))
    }

    async fn delete_all_permanent(
        &self,
        _request: Request<pb::Empty>,
    ) -> Result<Response<pb::AffectedReply>, Status> {
        let affected = self.service.delete_all_permanent().await?;
        Ok(Response::new(pb::AffectedReply { affected }))
    }
}

pub struct TopupStatsRpc {
    service: Arc<LedgerStatsService<model::Topup>>,
}

impl TopupStatsRpc {
    pub fn new(service: Arc<LedgerStatsService<model::Topup>>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl TopupStats for TopupStatsRpc {
    async fn get_stats(
        &self,
        request: Request<pb::StatsRequest>,
    ) -> Result<Response<pb::StatsReply>, Status> {
        let query = convert::stats_query(request.into_inner()).map_err(Status::from)?;
        let series = self.service.get_stats(query).await?;
        Ok(Response::new(convert::stats_reply(series)))
    }
}
